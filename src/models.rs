//! Records that cross the relay boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A text message delivered by the carrier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundCommand {
    /// Originating address, as the carrier reports it
    pub sender: String,
    pub body: String,
    /// Receipt time; the rate limiter and the reply both use this instant
    pub received_at: DateTime<Utc>,
}

impl InboundCommand {
    pub fn new(sender: impl Into<String>, body: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            received_at,
        }
    }
}

/// A position fix in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}
