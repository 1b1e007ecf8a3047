//! Migration identities and the stored version marker.
//!
//! Identities are fixed-width, timestamp-derived tokens
//! (`YYYYMMDDHHMMSSmmm`, 17 ASCII digits). Because the width is enforced at
//! construction, plain lexicographic comparison equals chronological order.

use devflow_core::{ConfigDocument, DevflowError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Number of digits in a migration identity.
pub const MIGRATION_ID_WIDTH: usize = 17;

/// Marker value meaning "no migrations applied yet".
pub const INITIAL_VERSION: &str = "0";

/// Validated identity of a migration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MigrationId(String);

impl MigrationId {
    /// Parses and validates an identity.
    ///
    /// # Errors
    ///
    /// Returns `DevflowError::InvalidMigrationId` unless `value` is exactly
    /// 17 ASCII digits.
    pub fn parse(value: &str) -> Result<Self, DevflowError> {
        if value.len() != MIGRATION_ID_WIDTH || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DevflowError::invalid_migration_id(format!(
                "'{}' (expected {} digits, e.g. 20240115093000000)",
                value, MIGRATION_ID_WIDTH
            )));
        }
        Ok(Self(value.to_string()))
    }

    /// Generates an identity from the current UTC time.
    pub fn now() -> Self {
        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S%3f").to_string();
        Self(stamp)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MigrationId {
    type Err = DevflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MigrationId {
    type Error = DevflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MigrationId> for String {
    fn from(id: MigrationId) -> Self {
        id.0
    }
}

/// Total order over identities used for sorting and pending computation.
pub fn compare(a: &MigrationId, b: &MigrationId) -> Ordering {
    a.as_str().cmp(b.as_str())
}

/// Parsed `migration_version` of a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VersionMarker {
    /// No migration has ever been applied.
    #[default]
    Initial,
    /// The last successfully applied migration.
    Applied(MigrationId),
}

impl VersionMarker {
    /// Parses a stored marker. `None`, `""` and `"0"` are the sentinel.
    pub fn parse(raw: Option<&str>) -> Result<Self, DevflowError> {
        match raw.map(str::trim) {
            None | Some("") | Some(INITIAL_VERSION) => Ok(Self::Initial),
            Some(value) => MigrationId::parse(value).map(Self::Applied),
        }
    }

    /// Reads the marker stored in `document`.
    ///
    /// # Errors
    ///
    /// Returns `DevflowError::InvalidMigrationId` when the stored value is
    /// neither the sentinel nor a valid identity, including values of the
    /// wrong type.
    pub fn of(document: &ConfigDocument) -> Result<Self, DevflowError> {
        Self::parse(document.checked_migration_version()?.as_deref())
    }

    /// Returns true if `id` has not been applied relative to this marker.
    pub fn is_behind(&self, id: &MigrationId) -> bool {
        match self {
            Self::Initial => true,
            Self::Applied(current) => compare(id, current) == Ordering::Greater,
        }
    }

    pub fn applied(&self) -> Option<&MigrationId> {
        match self {
            Self::Initial => None,
            Self::Applied(id) => Some(id),
        }
    }

    /// Returns the value written back into the document.
    pub fn as_stored(&self) -> &str {
        match self {
            Self::Initial => INITIAL_VERSION,
            Self::Applied(id) => id.as_str(),
        }
    }
}

impl fmt::Display for VersionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_stored())
    }
}

impl From<MigrationId> for VersionMarker {
    fn from(id: MigrationId) -> Self {
        Self::Applied(id)
    }
}
