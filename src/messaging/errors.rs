//! # Messaging Error Types
//!
//! Structured errors for the phone <-> companion message transport and the
//! vitals wire codec.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessagingError {
    #[error("Node unreachable: {node_id}")]
    NodeUnreachable { node_id: String },

    #[error("Delivery failed on {path}: {message}")]
    Delivery { path: String, message: String },

    #[error("Operation {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Message deserialization error: {message}")]
    MessageDeserialization { message: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Transport closed")]
    TransportClosed,
}

impl MessagingError {
    /// Create a node unreachable error
    pub fn node_unreachable(node_id: impl Into<String>) -> Self {
        Self::NodeUnreachable {
            node_id: node_id.into(),
        }
    }

    /// Create a delivery error
    pub fn delivery(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a message deserialization error
    pub fn message_deserialization(message: impl Into<String>) -> Self {
        Self::MessageDeserialization {
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Whether retrying the same exchange could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NodeUnreachable { .. } | Self::Delivery { .. } | Self::Timeout { .. }
        )
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;
