//! Command router — maps slash commands to handlers.
//!
//! # Flow
//!
//! A channel hands [`CommandRouter::dispatch`] the sender identity and the
//! raw message text. The first whitespace-delimited token selects the
//! [`Command`]; everything after it is the argument text. Unknown commands
//! and plain text produce no replies.
//!
//! Admin-only commands invoked by anyone else also produce no replies and
//! no error.
//!
//! Every recognised invocation runs through the registered
//! [`Interceptor`]s; [`LogInterceptor`] is installed by [`CommandRouter::new`].

pub mod context;
pub mod handlers;
pub mod middleware;
pub mod texts;

pub use context::{AppContext, CallerId};
pub use middleware::{Interceptor, Invocation, LogInterceptor, Outcome};

use std::sync::Arc;

use tracing::trace;

use crate::error::AppError;

// ── Command ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Start,
    Help,
    Corpuses,
    Gallery,
    News,
    Resources,
    Stats,
    Add,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::Start,
        Command::Help,
        Command::Corpuses,
        Command::Gallery,
        Command::News,
        Command::Resources,
        Command::Stats,
        Command::Add,
    ];

    /// Command text without the leading `/`.
    pub fn name(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Corpuses => "corpuses",
            Command::Gallery => "gallery",
            Command::News => "news",
            Command::Resources => "resources",
            Command::Stats => "stats",
            Command::Add => "add",
        }
    }

    /// Short menu description.
    pub fn description(self) -> &'static str {
        match self {
            Command::Start => "welcome and command summary",
            Command::Help => "show help",
            Command::Corpuses => "list of buildings",
            Command::Gallery => "building images",
            Command::News => "project progress",
            Command::Resources => "useful links",
            Command::Stats => "number of users (admin)",
            Command::Add => "add a building: Name | Description | path_to_image (admin)",
        }
    }

    pub fn is_admin_only(self) -> bool {
        matches!(self, Command::Stats | Command::Add)
    }

    /// Match a `/name` or `/name@botname` token. Case-sensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        let name = token.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(name, _mention)| name);
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// Split raw message text into a command and its argument text.
pub fn parse(text: &str) -> Option<(Command, &str)> {
    let text = text.trim_start();
    let (token, args) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    Command::from_token(token).map(|command| (command, args))
}

// ── Reply ─────────────────────────────────────────────────────────────────────

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Photo {
        data: Vec<u8>,
        file_name: String,
        caption: String,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

// ── CommandRouter ─────────────────────────────────────────────────────────────

pub struct CommandRouter {
    ctx: Arc<AppContext>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl CommandRouter {
    /// Router with the logging interceptor installed.
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self::without_interceptors(ctx).with_interceptor(Arc::new(LogInterceptor))
    }

    pub fn without_interceptors(ctx: Arc<AppContext>) -> Self {
        Self { ctx, interceptors: Vec::new() }
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Handle one inbound message and return the replies to deliver.
    pub async fn dispatch(&self, caller: CallerId, text: &str) -> Result<Vec<Reply>, AppError> {
        let Some((command, args)) = parse(text) else {
            trace!(%caller, "not a known command, ignoring");
            return Ok(Vec::new());
        };

        let invocation = Invocation { command, caller };
        for interceptor in &self.interceptors {
            interceptor.before(&invocation);
        }

        let result = self.run(command, caller, args).await;

        let outcome = match &result {
            Ok(replies) => Outcome::Replied { replies: replies.len() },
            Err(e) => Outcome::Failed { error: e.to_string() },
        };
        for interceptor in self.interceptors.iter().rev() {
            interceptor.after(&invocation, &outcome);
        }

        result
    }

    async fn run(&self, command: Command, caller: CallerId, args: &str) -> Result<Vec<Reply>, AppError> {
        let ctx = self.ctx.as_ref();

        if command.is_admin_only() && !ctx.is_admin(caller) {
            return Ok(Vec::new());
        }

        match command {
            Command::Start => Ok(handlers::start(ctx, caller).await),
            Command::Help => Ok(handlers::help()),
            Command::Corpuses => handlers::corpuses(ctx),
            Command::Gallery => handlers::gallery(ctx).await,
            Command::News => Ok(handlers::news(ctx)),
            Command::Resources => Ok(handlers::resources(ctx)),
            Command::Stats => Ok(handlers::stats(ctx).await),
            Command::Add => handlers::add(ctx, args).await,
        }
    }
}
