//! # Durable Rate-Limit Storage
//!
//! The relay persists exactly one value across restarts: the timestamp of the
//! last accepted request, under the key `last_req_ts`.

pub mod file_store;

use crate::config::StorageConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

pub use file_store::FileRateLimitStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read rate-limit store at {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to write rate-limit store at {path}: {message}")]
    Write { path: String, message: String },

    #[error("Corrupt rate-limit store at {path}: {message}")]
    Corrupt { path: String, message: String },
}

impl StorageError {
    pub fn read(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Read {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn write(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn corrupt(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence for the last accepted request timestamp (epoch seconds)
pub trait RateLimitStore: Send + Sync {
    /// `None` when no request has ever been accepted
    fn load(&self) -> StorageResult<Option<i64>>;

    fn save(&self, last_accepted: i64) -> StorageResult<()>;
}

/// File-backed store when a path is configured, in-memory otherwise
pub fn store_from_config(config: &StorageConfig) -> Arc<dyn RateLimitStore> {
    match &config.rate_limit_path {
        Some(path) => Arc::new(FileRateLimitStore::new(path.clone())),
        None => Arc::new(InMemoryRateLimitStore::new()),
    }
}

/// Process-local store; state is lost on restart
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    last_accepted: Mutex<Option<i64>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_last_accepted(last_accepted: i64) -> Self {
        Self {
            last_accepted: Mutex::new(Some(last_accepted)),
        }
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn load(&self) -> StorageResult<Option<i64>> {
        Ok(*self.last_accepted.lock())
    }

    fn save(&self, last_accepted: i64) -> StorageResult<()> {
        *self.last_accepted.lock() = Some(last_accepted);
        Ok(())
    }
}
