//! Outcome types and collaborator seams for the trigger pipeline.

use crate::error::CollaboratorError;
use crate::models::LocationFix;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Why a command was dropped without a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateRejection {
    /// A request was accepted less than the minimum interval ago
    RateLimited,
    /// Sender is not in the directory, or the lookup failed
    Untrusted,
    /// Body does not contain the trigger phrase
    NoTriggerPhrase,
}

impl GateRejection {
    pub fn gate_name(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limit",
            Self::Untrusted => "trust",
            Self::NoTriggerPhrase => "trigger_phrase",
        }
    }
}

impl fmt::Display for GateRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.gate_name())
    }
}

/// Terminal result of handling one inbound command
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// Stopped at a gate; nothing was sent
    Rejected(GateRejection),
    /// Reply handed to the carrier
    Replied {
        reply: String,
        telemetry_included: bool,
        location_included: bool,
    },
    /// Reply was built but the carrier refused it
    SendFailed {
        reply: String,
        error: CollaboratorError,
    },
    /// Something unexpected went wrong after acceptance
    Failed { error: String },
}

impl TriggerOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// The reply text, if one was produced
    pub fn reply(&self) -> Option<&str> {
        match self {
            Self::Replied { reply, .. } | Self::SendFailed { reply, .. } => Some(reply),
            _ => None,
        }
    }
}

/// Device positioning, best effort
#[async_trait]
pub trait PositioningProvider: Send + Sync {
    /// A fresh fix, or `None` if none could be obtained within `timeout`
    async fn get_fix(&self, timeout: Duration) -> Result<Option<LocationFix>, CollaboratorError>;
}

/// Outbound side of the text-message carrier
#[async_trait]
pub trait CarrierChannel: Send + Sync {
    async fn send(&self, destination: &str, text: &str) -> Result<(), CollaboratorError>;
}
