use crate::error::CollaboratorError;
use crate::models::LocationFix;
use crate::orchestration::PositioningProvider;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Positioning that answers with a preset result after a preset delay
#[derive(Debug)]
pub struct FixedPositioning {
    result: Result<Option<LocationFix>, CollaboratorError>,
    delay: Duration,
    requests: AtomicU64,
}

impl FixedPositioning {
    pub fn new(fix: LocationFix) -> Self {
        Self::with_result(Ok(Some(fix)))
    }

    /// No fix available
    pub fn unavailable() -> Self {
        Self::with_result(Ok(None))
    }

    pub fn failing(error: CollaboratorError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(result: Result<Option<LocationFix>, CollaboratorError>) -> Self {
        Self {
            result,
            delay: Duration::ZERO,
            requests: AtomicU64::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PositioningProvider for FixedPositioning {
    async fn get_fix(&self, _timeout: Duration) -> Result<Option<LocationFix>, CollaboratorError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }
}
