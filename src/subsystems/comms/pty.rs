//! PTY (console) comms channel — reads lines from stdin, routes them as
//! commands from the configured console caller, prints the replies.
//!
//! Implements [`Channel`] so the comms subsystem can spawn it as an
//! independent task. All routing goes through [`CommsState::handle_message`].
//!
//! Runs until the `shutdown` token is cancelled (Ctrl-C) or stdin is closed.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commands::{CallerId, Reply};
use crate::error::AppError;
use super::{Channel, ChannelFuture};
use super::state::{CommsEvent, CommsState};

// ── PtyChannel ───────────────────────────────────────────────────────────────

/// A PTY channel instance. Every line is attributed to `caller`.
pub struct PtyChannel {
    channel_id: String,
    state: Arc<CommsState>,
    caller: CallerId,
}

impl PtyChannel {
    pub fn new(channel_id: impl Into<String>, state: Arc<CommsState>, caller: CallerId) -> Self {
        Self { channel_id: channel_id.into(), state, caller }
    }
}

impl Channel for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ChannelFuture {
        let PtyChannel { channel_id, state, caller } = *self;
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        Box::pin(run_console(channel_id, state, caller, reader, writer, shutdown))
    }
}

// ── run_console ──────────────────────────────────────────────────────────────

async fn run_console<R, W>(
    channel_id: String,
    state: Arc<CommsState>,
    caller: CallerId,
    reader: R,
    mut writer: W,
    shutdown: CancellationToken,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!(%channel_id, %caller, "pty channel started — type a command and press Enter. Ctrl-C to quit.");
    state.report_event(CommsEvent::SessionStarted { channel_id: channel_id.clone() });

    let mut lines = reader.lines();

    loop {
        writer.write_all(b"> ").await?;
        writer.flush().await?;

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!(%channel_id, "pty channel shutting down");
                break;
            }

            line = lines.next_line() => {
                match line {
                    Err(e) => {
                        warn!("pty read error: {e}");
                        break;
                    }
                    Ok(None) => {
                        info!(%channel_id, "pty stdin closed");
                        break;
                    }
                    Ok(Some(input)) => {
                        let input = input.trim();
                        if input.is_empty() { continue; }

                        debug!(input = %input, "pty received line");

                        match state.handle_message(&channel_id, caller, input).await {
                            Err(e) => {
                                warn!("command failed: {e}");
                                writer.write_all(b"Internal error processing message.\n").await?;
                            }
                            Ok(replies) => {
                                for reply in replies {
                                    writer.write_all(render(&reply).as_bytes()).await?;
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    writer.flush().await?;
    state.report_event(CommsEvent::ChannelShutdown { channel_id });
    Ok(())
}

/// Console rendering; photos are shown as a placeholder line.
fn render(reply: &Reply) -> String {
    match reply {
        Reply::Text(text) => format!("{text}\n"),
        Reply::Photo { data, file_name, caption } => {
            format!("[image {file_name}, {} bytes] {caption}\n", data.len())
        }
    }
}
