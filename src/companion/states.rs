use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one vitals request on the companion side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderState {
    /// Waiting for a request
    Idle,
    /// Sensor listeners registered, collecting readings
    Sampling,
    /// Reply being sent; terminal for the request
    Responding,
}

impl ResponderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Responding)
    }

    /// Apply `event`, returning the next state or `None` for an invalid transition
    pub fn transition(self, event: ResponderEvent) -> Option<Self> {
        match (self, event) {
            (Self::Idle, ResponderEvent::RequestReceived { permitted: true }) => {
                Some(Self::Sampling)
            }
            (Self::Idle, ResponderEvent::RequestReceived { permitted: false }) => {
                Some(Self::Responding)
            }
            (Self::Sampling, ResponderEvent::ReadingsSatisfied)
            | (Self::Sampling, ResponderEvent::WindowElapsed) => Some(Self::Responding),
            _ => None,
        }
    }
}

impl fmt::Display for ResponderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Sampling => write!(f, "sampling"),
            Self::Responding => write!(f, "responding"),
        }
    }
}

/// Events driving [`ResponderState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderEvent {
    /// A request arrived; `permitted` is the body-sensor permission at that moment
    RequestReceived { permitted: bool },
    /// Heart rate valid and oxygen captured or unavailable
    ReadingsSatisfied,
    /// Sampling window ran out
    WindowElapsed,
}

impl ResponderEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RequestReceived { .. } => "request_received",
            Self::ReadingsSatisfied => "readings_satisfied",
            Self::WindowElapsed => "window_elapsed",
        }
    }
}
