//! Telegram comms channel — long-polls the Bot API, routes each text message
//! through the command router and sends the replies back to the same chat.

use std::env;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{BotCommand, InputFile};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commands::{CallerId, Command, Reply};
use crate::error::AppError;
use super::{Channel, ChannelFuture};
use super::state::{CommsEvent, CommsState};

// ── Constants ────────────────────────────────────────────────────────────────

/// Telegram has a 4096 character limit per message.
/// We chunk at 4000 to be safe.
const MAX_MESSAGE_LENGTH: usize = 4000;

// ── TelegramChannel ──────────────────────────────────────────────────────────

/// A Telegram channel instance.
pub struct TelegramChannel {
    channel_id: String,
    state: Arc<CommsState>,
}

impl TelegramChannel {
    pub fn new(channel_id: impl Into<String>, state: Arc<CommsState>) -> Self {
        Self { channel_id: channel_id.into(), state }
    }
}

impl Channel for TelegramChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ChannelFuture {
        Box::pin(run_telegram(self.channel_id, self.state, shutdown))
    }
}

// ── run_telegram ─────────────────────────────────────────────────────────────

async fn run_telegram(
    channel_id: String,
    state: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let token = match env::var("TELEGRAM_BOT_TOKEN") {
        Ok(t) => t,
        Err(_) => {
            warn!(%channel_id, "TELEGRAM_BOT_TOKEN not set, telegram channel exiting");
            return Ok(());
        }
    };

    info!(%channel_id, "telegram channel starting");

    let bot = Bot::new(token);

    if let Err(e) = bot.set_my_commands(command_menu()).await {
        warn!(%channel_id, "failed to register command menu: {e}");
    }

    state.report_event(CommsEvent::SessionStarted { channel_id: channel_id.clone() });

    let state_clone = state.clone();
    let channel_id_clone = channel_id.clone();

    let handler = Update::filter_message().endpoint(
        move |bot: Bot, msg: Message| {
            let state = state_clone.clone();
            let channel_id = channel_id_clone.clone();
            async move {
                let (Some(text), Some(user)) = (msg.text(), msg.from.as_ref()) else {
                    return respond(());
                };
                let caller = CallerId(user.id.0);
                debug!(%channel_id, %caller, from = ?user.username, "telegram received message");

                match state.handle_message(&channel_id, caller, text).await {
                    Ok(replies) => {
                        for reply in replies {
                            deliver(&bot, msg.chat.id, reply).await;
                        }
                    }
                    Err(e) => {
                        warn!("command failed: {e}");
                        let _ = bot.send_message(msg.chat.id, "Internal error processing message.").await;
                    }
                }
                respond(())
            }
        }
    );

    let mut dispatcher = Dispatcher::builder(bot, handler).build();

    tokio::select! {
        biased;

        _ = shutdown.cancelled() => {
            info!(%channel_id, "shutdown signal received — closing telegram channel");
        }
        _ = dispatcher.dispatch() => {
            warn!(%channel_id, "telegram dispatcher exited unexpectedly");
        }
    }

    state.report_event(CommsEvent::ChannelShutdown { channel_id });
    Ok(())
}

/// Send one reply. Delivery failures are logged and do not stop the rest.
async fn deliver(bot: &Bot, chat_id: ChatId, reply: Reply) {
    match reply {
        Reply::Text(text) => {
            for chunk in chunk_text(&text) {
                if let Err(e) = bot.send_message(chat_id, chunk).await {
                    warn!("failed to send telegram reply: {e}");
                }
            }
        }
        Reply::Photo { data, file_name, caption } => {
            let photo = InputFile::memory(data).file_name(file_name);
            if let Err(e) = bot.send_photo(chat_id, photo).caption(caption).await {
                warn!("failed to send telegram photo: {e}");
            }
        }
    }
}

/// Public commands shown in the client menu. Admin commands stay unlisted.
fn command_menu() -> Vec<BotCommand> {
    Command::ALL
        .into_iter()
        .filter(|c| !c.is_admin_only())
        .map(|c| BotCommand::new(c.name(), c.description()))
        .collect()
}

fn chunk_text(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(MAX_MESSAGE_LENGTH)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
