//! Comms subsystem — manages all external I/O channels.
//!
//! # Architecture
//!
//! Each channel (PTY, Telegram) implements [`Channel`] and is spawned as an
//! independent concurrent task by [`start`]. Channels capture their shared
//! [`Arc<CommsState>`] at construction time; only the shutdown token is
//! passed to [`Channel::run`].
//!
//! A channel that fails cancels the shared token so the others stop, and
//! [`CommsHandle::join`] reports the first failure tagged with the channel id.
//!
//! An intra-subsystem [`mpsc`] channel lets running channels signal the
//! comms manager (lifecycle events). This is drained in a short-lived
//! background task that dies naturally when all channel senders are dropped.

mod state;
#[cfg(feature = "channel-pty")]
pub mod pty;
#[cfg(feature = "channel-telegram")]
pub mod telegram;

pub use state::{CommsEvent, CommsState};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::commands::CommandRouter;
use crate::config::Config;
use crate::error::AppError;

// ── Channel ──────────────────────────────────────────────────────────────────

pub type ChannelFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// A transport that feeds inbound messages to [`CommsState`] until shutdown.
pub trait Channel: Send + 'static {
    /// Stable identifier used in log messages, e.g. `"telegram0"`.
    fn id(&self) -> &str;

    /// Consume the channel and return its run-loop.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> ChannelFuture;
}

// ── CommsHandle ──────────────────────────────────────────────────────────────

/// Resolves once every spawned channel has exited.
pub struct CommsHandle {
    inner: JoinHandle<Result<(), AppError>>,
}

impl CommsHandle {
    /// Wait for all channels; returns the first channel failure, if any.
    pub async fn join(self) -> Result<(), AppError> {
        self.inner
            .await
            .map_err(|e| AppError::Comms(format!("comms manager panicked: {e}")))?
    }
}

// ── start ───────────────────────────────────────────────────────────────────

/// Build the configured channels and spawn them. Non-blocking: the caller
/// decides when to await the returned [`CommsHandle`].
pub fn start(
    config: &Config,
    router: Arc<CommandRouter>,
    shutdown: CancellationToken,
) -> CommsHandle {
    // Intra-subsystem event channel: channels → manager.
    let (event_tx, event_rx) = mpsc::channel::<CommsEvent>(32);
    let state = Arc::new(CommsState::new(router, event_tx));

    let mut channels: Vec<Box<dyn Channel>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    {
        if config.comms_pty_should_load() {
            info!("loading pty channel");
            let caller = crate::commands::CallerId(config.comms.pty.caller_id);
            channels.push(Box::new(pty::PtyChannel::new("pty0", state.clone(), caller)));
        }
    }

    #[cfg(feature = "channel-telegram")]
    {
        if config.comms_telegram_should_load() {
            info!("loading telegram channel");
            channels.push(Box::new(telegram::TelegramChannel::new("telegram0", state.clone())));
        }
    }

    if channels.is_empty() {
        warn!("no comms channels configured — nothing to serve");
    }

    // Only channels hold senders from here on.
    drop(state);

    tokio::spawn(async move {
        let mut rx = event_rx;
        while let Some(event) = rx.recv().await {
            match event {
                CommsEvent::ChannelShutdown { ref channel_id } => {
                    debug!(channel_id, "channel reported shutdown");
                }
                CommsEvent::SessionStarted { ref channel_id } => {
                    debug!(channel_id, "channel session started");
                }
            }
        }
    });

    spawn_channels(channels, shutdown)
}

fn spawn_channels(channels: Vec<Box<dyn Channel>>, shutdown: CancellationToken) -> CommsHandle {
    let inner = tokio::spawn(async move {
        let mut set = JoinSet::new();
        for channel in channels {
            let channel_id = channel.id().to_string();
            debug!(%channel_id, "spawning channel");
            let run = channel.run(shutdown.clone());
            set.spawn(async move { (channel_id, run.await) });
        }

        let mut first_err: Option<AppError> = None;
        while let Some(joined) = set.join_next().await {
            let failure = match joined {
                Ok((_, Ok(()))) => continue,
                Ok((channel_id, Err(e))) => format!("channel {channel_id} failed: {e}"),
                Err(e) => format!("channel task panicked: {e}"),
            };
            error!("{failure}");
            shutdown.cancel();
            first_err.get_or_insert(AppError::Comms(failure));
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    });

    CommsHandle { inner }
}
