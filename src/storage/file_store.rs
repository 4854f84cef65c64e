//! JSON-file implementation of [`RateLimitStore`].
//!
//! The file holds a single object, `{"last_req_ts": <epoch-seconds>}`. Writes
//! go to a sibling temp file first and are renamed into place so a crash
//! mid-write never leaves a truncated document.

use super::{RateLimitStore, StorageError, StorageResult};
use crate::constants::RATE_LIMIT_KEY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct RateLimitDocument {
    last_req_ts: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct FileRateLimitStore {
    path: PathBuf,
}

impl FileRateLimitStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

impl RateLimitStore for FileRateLimitStore {
    fn load(&self) -> StorageResult<Option<i64>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No rate-limit state on disk yet");
                return Ok(None);
            }
            Err(e) => return Err(StorageError::read(self.display_path(), e)),
        };

        let document: RateLimitDocument = serde_json::from_str(&content)
            .map_err(|e| StorageError::corrupt(self.display_path(), e))?;
        Ok(document.last_req_ts)
    }

    fn save(&self, last_accepted: i64) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::write(self.display_path(), e))?;
        }

        let document = RateLimitDocument {
            last_req_ts: Some(last_accepted),
        };
        let body = serde_json::to_vec(&document)
            .map_err(|e| StorageError::write(self.display_path(), e))?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, body).map_err(|e| StorageError::write(self.display_path(), e))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| StorageError::write(self.display_path(), e))?;

        debug!(path = %self.path.display(), key = RATE_LIMIT_KEY, value = last_accepted, "Rate-limit state persisted");
        Ok(())
    }
}
