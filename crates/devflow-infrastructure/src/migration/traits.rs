//! Core traits for the migration framework.
//!
//! This module defines the contract every configuration migration implements.

use super::id::MigrationId;
use devflow_core::{ConfigDocument, DevflowError, Scope};
use thiserror::Error;

/// The only error a migration transform produces.
///
/// The executor always catches it and reclassifies it through the
/// migration's prerequisite flag.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransformError {
    message: String,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// A key the transform depends on is missing.
    pub fn missing_key(key: &str) -> Self {
        Self::new(format!("required key '{}' is missing", key))
    }

    /// A key holds a value of the wrong type.
    pub fn unexpected_type(key: &str, expected: &str) -> Self {
        Self::new(format!("key '{}' must be a {}", key, expected))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<DevflowError> for TransformError {
    fn from(err: DevflowError) -> Self {
        Self::new(err.to_string())
    }
}

/// A single, ordered transformation of one configuration document.
///
/// Implementations are stateless. They are built fresh for every discovery
/// pass and dropped afterwards.
pub trait Migration: Send + Sync + std::fmt::Debug {
    /// Returns the identity that orders this migration within its scope.
    fn id(&self) -> MigrationId;

    /// Returns a human-readable description of this migration.
    ///
    /// Used for logging and user-facing reports.
    fn description(&self) -> &str;

    /// Returns the document this migration targets.
    fn scope(&self) -> Scope;

    /// Whether the invoking workflow must stop when this migration fails.
    fn is_prerequisite(&self) -> bool {
        false
    }

    /// Transforms the document forward.
    ///
    /// Must be a pure function of `document`. When there is nothing to
    /// migrate it returns the document unchanged instead of failing.
    fn up(&self, document: &ConfigDocument) -> Result<ConfigDocument, TransformError>;

    /// Best-effort reverse of [`Migration::up`], for manual reversal only.
    ///
    /// It does not have to invert `up` exactly. The default leaves the
    /// document unchanged.
    fn down(&self, document: &ConfigDocument) -> Result<ConfigDocument, TransformError> {
        Ok(document.clone())
    }
}
