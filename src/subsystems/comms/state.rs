//! Shared state for the Comms subsystem — capability boundary for channels.
//!
//! Channels receive an `Arc<CommsState>` and are restricted to the typed
//! methods below. The router is private; channels only hand over a caller
//! identity and raw text, and get replies back.
//!
//! # Intra-subsystem events
//!
//! [`CommsState::report_event`] lets a running channel signal the comms
//! subsystem manager (e.g. "I shut down", "new session started"). The manager
//! owns the receiver end.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::commands::{CallerId, CommandRouter, Reply};
use crate::error::AppError;

// ── Events ────────────────────────────────────────────────────────────────────

/// Events a channel sends back to the comms subsystem manager.
#[derive(Debug)]
pub enum CommsEvent {
    /// Channel has stopped (clean exit or EOF).
    ChannelShutdown { channel_id: String },
    /// A new session/connection was established on the channel.
    SessionStarted { channel_id: String },
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Shared state passed as `Arc<CommsState>` to every channel task.
pub struct CommsState {
    router: Arc<CommandRouter>,
    /// Back-channel to the comms subsystem manager.
    event_tx: mpsc::Sender<CommsEvent>,
}

impl CommsState {
    pub fn new(router: Arc<CommandRouter>, event_tx: mpsc::Sender<CommsEvent>) -> Self {
        Self { router, event_tx }
    }

    /// Route one inbound message from `channel_id` and return the replies to
    /// deliver, possibly none.
    pub async fn handle_message(
        &self,
        channel_id: &str,
        caller: CallerId,
        text: &str,
    ) -> Result<Vec<Reply>, AppError> {
        debug!(%channel_id, %caller, "routing inbound message");
        self.router.dispatch(caller, text).await
    }

    /// Report an event to the comms subsystem manager.
    ///
    /// Non-blocking: drops the event and logs a warning if the manager is not
    /// keeping up (channel full) or has already exited (closed).
    pub fn report_event(&self, event: CommsEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("comms event dropped: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{AppContext, texts};
    use crate::config::ContentConfig;
    use crate::records::RecordStore;

    fn state(dir: &tempfile::TempDir) -> (CommsState, mpsc::Receiver<CommsEvent>) {
        let ctx = AppContext::new(
            RecordStore::new(dir.path().join("models.json")),
            None,
            ContentConfig::default(),
            dir.path(),
        );
        let router = Arc::new(CommandRouter::without_interceptors(Arc::new(ctx)));
        let (tx, rx) = mpsc::channel(1);
        (CommsState::new(router, tx), rx)
    }

    #[tokio::test]
    async fn forwards_to_router() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _rx) = state(&dir);
        let replies = state.handle_message("pty0", CallerId(5), "/help").await.unwrap();
        assert_eq!(replies, vec![Reply::text(texts::HELP)]);
    }

    #[tokio::test]
    async fn events_reach_manager_and_overflow_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let (state, mut rx) = state(&dir);
        state.report_event(CommsEvent::SessionStarted { channel_id: "pty0".into() });
        // Capacity is one; the second event is dropped instead of blocking.
        state.report_event(CommsEvent::ChannelShutdown { channel_id: "pty0".into() });

        match rx.recv().await {
            Some(CommsEvent::SessionStarted { channel_id }) => assert_eq!(channel_id, "pty0"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }
}
