//! # Relay Error Types
//!
//! Crate-level error enum. Each concern keeps its own `thiserror` type
//! (configuration, messaging, storage, collaborators) and converts into
//! [`RelayError`] at module boundaries.

use crate::config::ConfigurationError;
use crate::messaging::MessagingError;
use crate::storage::StorageError;
use thiserror::Error;

/// Failures reported by external collaborators (directory, positioning, carrier)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("{collaborator} unavailable: {message}")]
    Unavailable {
        collaborator: String,
        message: String,
    },

    #[error("{collaborator} permission denied: {message}")]
    PermissionDenied {
        collaborator: String,
        message: String,
    },

    #[error("Malformed identifier '{identifier}': {reason}")]
    MalformedIdentifier { identifier: String, reason: String },
}

impl CollaboratorError {
    pub fn unavailable(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    pub fn permission_denied(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    pub fn malformed_identifier(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("Relay is shutting down; command from {sender} refused")]
    ShuttingDown { sender: String },
}

pub type Result<T> = std::result::Result<T, RelayError>;
