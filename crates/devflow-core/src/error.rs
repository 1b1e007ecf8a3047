//! Errors shared by every devflow crate.

use thiserror::Error;

/// Error type returned across crate boundaries.
///
/// Lower layers keep their own detailed errors and convert into this one at
/// the seam, so callers only ever match on a single enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DevflowError {
    /// A named item (migration, key) does not exist
    #[error("{entity_type} '{id}' not found")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Reading or writing a file failed
    #[error("IO error: {message}")]
    Io { message: String },

    /// A document could not be encoded or decoded
    #[error("{format} error: {message}")]
    Serialization {
        format: &'static str,
        message: String,
    },

    /// A configuration value or path is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// A migration identity or stored version marker is malformed
    #[error("Invalid migration id: {0}")]
    InvalidMigrationId(String),

    /// A migration run or reversal stopped before finishing
    #[error("Migration error: {message}")]
    Migration {
        kind: MigrationFailure,
        /// Identity of the migration involved, when one is known
        id: Option<String>,
        message: String,
    },

    /// Another process holds the configuration file
    #[error("Lock error: {0}")]
    Lock(String),
}

/// What stopped a migration workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationFailure {
    /// A prerequisite migration's transform failed.
    Prerequisite,
    /// The document could not be saved after a successful transform.
    Persistence,
    /// A manual reversal was refused or its `down` failed.
    Rollback,
}

impl DevflowError {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_migration_id(value: impl Into<String>) -> Self {
        Self::InvalidMigrationId(value.into())
    }

    pub fn migration(
        kind: MigrationFailure,
        id: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Migration {
            kind,
            id,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    pub fn is_migration(&self) -> bool {
        matches!(self, Self::Migration { .. })
    }

    /// Returns the failure kind of a `Migration` error.
    pub fn migration_failure(&self) -> Option<MigrationFailure> {
        match self {
            Self::Migration { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DevflowError {
    fn from(err: std::io::Error) -> Self {
        Self::io(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for DevflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON",
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for DevflowError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML",
            message: err.message().to_string(),
        }
    }
}

impl From<toml::ser::Error> for DevflowError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML",
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DevflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion_keeps_kind() {
        let err: DevflowError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(err.is_io());
        assert!(err.to_string().contains("PermissionDenied"));
    }

    #[test]
    fn test_toml_error_is_serialization() {
        let parse_err = toml::from_str::<toml::Value>("key = ").unwrap_err();
        let err: DevflowError = parse_err.into();
        assert!(err.is_serialization());
        assert!(err.to_string().contains("TOML"));
    }

    #[test]
    fn test_constructor_helpers() {
        assert!(DevflowError::not_found("migration", "1").is_not_found());
        let err = DevflowError::migration(
            MigrationFailure::Persistence,
            Some("20240115093000000".to_string()),
            "disk full",
        );
        assert!(err.is_migration());
        assert_eq!(err.migration_failure(), Some(MigrationFailure::Persistence));
        assert_eq!(DevflowError::io("x").migration_failure(), None);
        assert_eq!(
            DevflowError::invalid_migration_id("abc").to_string(),
            "Invalid migration id: abc"
        );
    }
}
