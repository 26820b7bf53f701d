//! Per-process application context shared by every command invocation.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use crate::config::{Config, ContentConfig};
use crate::records::RecordStore;

/// Numeric identity of the message sender, as supplied by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallerId(pub u64);

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a handler may touch: the record store, the set of callers seen
/// via `/start`, the admin identity and the replaceable texts.
///
/// The seen-users set lives only in memory and starts empty on every run.
pub struct AppContext {
    store: RecordStore,
    seen_users: RwLock<HashSet<CallerId>>,
    admin: Option<CallerId>,
    content: ContentConfig,
    work_dir: PathBuf,
}

impl AppContext {
    pub fn new(
        store: RecordStore,
        admin: Option<CallerId>,
        content: ContentConfig,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            seen_users: RwLock::new(HashSet::new()),
            admin,
            content,
            work_dir: work_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            RecordStore::new(config.models_path()),
            config.admin_id.map(CallerId),
            config.content.clone(),
            config.work_dir.clone(),
        )
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn content(&self) -> &ContentConfig {
        &self.content
    }

    pub fn is_admin(&self, caller: CallerId) -> bool {
        self.admin == Some(caller)
    }

    pub async fn greet(&self, caller: CallerId) {
        self.seen_users.write().await.insert(caller);
    }

    pub async fn user_count(&self) -> usize {
        self.seen_users.read().await.len()
    }

    /// Relative image paths are taken from the work directory.
    pub fn resolve_path(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }
}
