//! Interceptors run around every handler invocation.
//!
//! The router calls [`Interceptor::before`] on each registered interceptor in
//! order, runs the handler, then calls [`Interceptor::after`] in reverse
//! order. Hooks fire for every recognised command, including admin commands
//! that end in a silent denial and handlers that fail.

use tracing::{info, warn};

use super::Command;
use super::context::CallerId;

/// What is being invoked, and by whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub caller: CallerId,
}

/// How the invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Handler finished; `replies` may be zero.
    Replied { replies: usize },
    /// Handler returned an error, rendered as text.
    Failed { error: String },
}

pub trait Interceptor: Send + Sync {
    fn before(&self, invocation: &Invocation);

    fn after(&self, invocation: &Invocation, outcome: &Outcome);
}

/// Logs `"<command>: active"` on entry and `"<command>: inactive"` on exit.
pub struct LogInterceptor;

impl Interceptor for LogInterceptor {
    fn before(&self, invocation: &Invocation) {
        info!(caller = %invocation.caller, "{}: active", invocation.command.name());
    }

    fn after(&self, invocation: &Invocation, outcome: &Outcome) {
        match outcome {
            Outcome::Replied { replies } => {
                info!(
                    caller = %invocation.caller,
                    replies,
                    "{}: inactive",
                    invocation.command.name()
                );
            }
            Outcome::Failed { error } => {
                warn!(
                    caller = %invocation.caller,
                    %error,
                    "{}: failed",
                    invocation.command.name()
                );
            }
        }
    }
}
