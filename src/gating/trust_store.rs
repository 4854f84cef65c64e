//! Trusted-sender lookup.
//!
//! [`TrustStore`] wraps a [`Directory`] collaborator and fails closed: any
//! lookup error is reported as "not trusted".

use crate::error::CollaboratorError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Contact directory collaborator
#[async_trait]
pub trait Directory: Send + Sync {
    async fn is_trusted(&self, identifier: &str) -> Result<bool, CollaboratorError>;
}

pub struct TrustStore {
    directory: Arc<dyn Directory>,
}

impl TrustStore {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    pub async fn is_trusted(&self, sender: &str) -> bool {
        match self.directory.is_trusted(sender).await {
            Ok(trusted) => {
                debug!(sender = %sender, trusted = trusted, "Directory lookup complete");
                trusted
            }
            Err(e) => {
                warn!(sender = %sender, error = %e, "Directory lookup failed, treating sender as untrusted");
                false
            }
        }
    }
}

/// Directory backed by a fixed list of identifiers.
///
/// Identifiers are compared after [`normalize_identifier`], so
/// `+1 (555) 123-0000` and `+15551230000` are the same entry.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    trusted: HashSet<String>,
}

impl StaticDirectory {
    /// Malformed entries are skipped with a warning
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trusted = HashSet::new();
        for identifier in identifiers {
            match normalize_identifier(identifier.as_ref()) {
                Ok(normalized) => {
                    trusted.insert(normalized);
                }
                Err(e) => warn!(error = %e, "Skipping malformed trusted sender"),
            }
        }
        Self { trusted }
    }

    pub fn len(&self) -> usize {
        self.trusted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trusted.is_empty()
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn is_trusted(&self, identifier: &str) -> Result<bool, CollaboratorError> {
        let normalized = normalize_identifier(identifier)?;
        Ok(self.trusted.contains(&normalized))
    }
}

/// Strip phone-number punctuation, keeping a single leading `+`
pub fn normalize_identifier(identifier: &str) -> Result<String, CollaboratorError> {
    let trimmed = identifier.trim();
    let (prefix, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let digits: String = rest
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    if digits.is_empty() {
        return Err(CollaboratorError::malformed_identifier(
            identifier,
            "no digits in identifier",
        ));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(CollaboratorError::malformed_identifier(
            identifier,
            "identifier contains non-numeric characters",
        ));
    }

    Ok(format!("{prefix}{digits}"))
}
