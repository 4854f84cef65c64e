//! Misbehaving collaborators.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use telemetry_relay::constants::paths;
use telemetry_relay::error::CollaboratorError;
use telemetry_relay::gating::Directory;
use telemetry_relay::messaging::{
    LoopbackEndpoint, MessageHandler, MessageTransport, TransportMessage, VitalsResponse,
};
use telemetry_relay::VitalsQuery;

/// Directory whose backing service is down
pub struct UnreachableDirectory;

#[async_trait]
impl Directory for UnreachableDirectory {
    async fn is_trusted(&self, _identifier: &str) -> Result<bool, CollaboratorError> {
        Err(CollaboratorError::unavailable("directory", "contacts provider offline"))
    }
}

/// Trusts every sender, but only after giving other tasks a turn
#[derive(Default)]
pub struct YieldingDirectory {
    pub calls: AtomicU64,
}

#[async_trait]
impl Directory for YieldingDirectory {
    async fn is_trusted(&self, _identifier: &str) -> Result<bool, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(true)
    }
}

pub struct PanickingDirectory;

#[async_trait]
impl Directory for PanickingDirectory {
    async fn is_trusted(&self, _identifier: &str) -> Result<bool, CollaboratorError> {
        panic!("directory exploded");
    }
}

/// Query client that panics on first use
#[derive(Default)]
pub struct PanickingCompanion {
    pub calls: AtomicU64,
}

#[async_trait]
impl VitalsQuery for PanickingCompanion {
    async fn request_once(&self, _timeout: Duration) -> Option<VitalsResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("companion link corrupted");
    }
}

/// Companion that answers each request after a per-request delay, reporting
/// the given heart rate. Requests beyond the script go unanswered.
pub struct DelayedCompanion {
    endpoint: LoopbackEndpoint,
    script: Mutex<VecDeque<(Duration, i32)>>,
}

impl DelayedCompanion {
    pub fn new(endpoint: LoopbackEndpoint, script: impl IntoIterator<Item = (Duration, i32)>) -> Self {
        Self {
            endpoint,
            script: Mutex::new(script.into_iter().collect()),
        }
    }
}

#[async_trait]
impl MessageHandler for DelayedCompanion {
    async fn on_message(&self, message: TransportMessage) {
        let next = self.script.lock().pop_front();
        let Some((delay, heart_rate)) = next else {
            return;
        };
        tokio::time::sleep(delay).await;
        let payload = VitalsResponse::new(Some(heart_rate), None, 0).encode();
        let _ = self
            .endpoint
            .send(message.reply(paths::VITALS_RESPONSE, payload))
            .await;
    }
}
