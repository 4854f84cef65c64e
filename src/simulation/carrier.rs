//! Carrier stand-ins: one prints replies, one records them.

use crate::error::CollaboratorError;
use crate::orchestration::CarrierChannel;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

/// Writes each outbound reply to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleCarrier;

#[async_trait]
impl CarrierChannel for ConsoleCarrier {
    async fn send(&self, destination: &str, text: &str) -> Result<(), CollaboratorError> {
        info!(destination = %destination, "Reply handed to console carrier");
        println!("-> {destination}: {text}");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub destination: String,
    pub text: String,
}

/// Keeps every reply in memory; can be told to refuse sends
#[derive(Debug, Default)]
pub struct RecordingCarrier {
    sent: Mutex<Vec<SentMessage>>,
    failure: Mutex<Option<CollaboratorError>>,
    attempts: Mutex<u64>,
}

impl RecordingCarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every send with `error` until cleared
    pub fn fail_with(&self, error: CollaboratorError) {
        *self.failure.lock() = Some(error);
    }

    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Sends attempted, including refused ones
    pub fn attempts(&self) -> u64 {
        *self.attempts.lock()
    }
}

#[async_trait]
impl CarrierChannel for RecordingCarrier {
    async fn send(&self, destination: &str, text: &str) -> Result<(), CollaboratorError> {
        *self.attempts.lock() += 1;
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        self.sent.lock().push(SentMessage {
            destination: destination.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}
