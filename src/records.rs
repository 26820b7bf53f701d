//! Building record store — one pretty-printed JSON file mapping model name to
//! `{ "description": ..., "image": ... }`.
//!
//! There is no in-memory cache: every command loads the file fresh, and the
//! only mutation path replaces the whole file. Writers inside this process
//! serialise through [`RecordStore::write_lock`]; other processes touching the
//! same file are not guarded (last writer wins).

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::error::AppError;

/// One building model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub description: String,
    /// Image path as typed by the admin. Existence is checked at use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Model name -> record.
pub type Models = BTreeMap<String, ModelRecord>;

pub struct RecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted mapping. A missing file is an empty mapping.
    pub fn load(&self) -> Result<Models, AppError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Models::new()),
            Err(e) => {
                return Err(AppError::Store(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )));
            }
        };
        if data.trim().is_empty() {
            return Ok(Models::new());
        }
        serde_json::from_str(&data)
            .map_err(|e| AppError::Store(format!("malformed {}: {e}", self.path.display())))
    }

    /// Replace the file contents with `models`.
    ///
    /// Writes a sibling temp file and renames it over the target, so readers
    /// never observe a half-written mapping.
    pub fn save(&self, models: &Models) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Store(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let data = serde_json::to_string_pretty(models)
            .map_err(|e| AppError::Store(format!("serialise models: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data)
            .map_err(|e| AppError::Store(format!("cannot write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| AppError::Store(format!("cannot replace {}: {e}", self.path.display())))
    }

    /// Hold this across a load-mutate-save sequence.
    pub async fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }
}
