//! Configuration documents and their scopes.
//!
//! A configuration document is a flat, string-keyed mapping persisted to disk.
//! Nested tables are allowed and addressed with dotted paths (`jira.url`).

use crate::error::{DevflowError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Reserved key holding the identity of the last applied migration.
pub const MIGRATION_VERSION_KEY: &str = "migration_version";

/// Which configuration document a migration (or command) targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// User-wide settings (`~/.config/devflow/config.toml`).
    Global,
    /// Per-repository settings (`<repo>/.devflow.toml`).
    Project,
}

impl Scope {
    /// Returns all scopes in the order workflows process them.
    pub const fn all() -> &'static [Scope] {
        &[Scope::Global, Scope::Project]
    }

    /// Returns the lowercase name of this scope.
    pub const fn name(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Project => "project",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scope {
    type Err = DevflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(Scope::Global),
            "project" => Ok(Scope::Project),
            other => Err(DevflowError::config(format!(
                "unknown scope '{}' (expected 'global' or 'project')",
                other
            ))),
        }
    }
}

/// An in-memory configuration document.
///
/// Values are heterogeneous (strings, booleans, numbers, nested tables). The
/// on-disk format is owned by the storage layer; this type only needs to
/// round-trip a string-keyed mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument {
    entries: Map<String, Value>,
}

impl ConfigDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing JSON object.
    pub fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Converts a JSON value into a document.
    ///
    /// # Errors
    ///
    /// Returns `DevflowError::Config` if the value is not an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(DevflowError::config(format!(
                "configuration root must be a table, found {}",
                type_name(&other)
            ))),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.entries)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Sets a top-level key, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Looks up a value by dotted path (`jira.auth.token`).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.entries.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Sets a value by dotted path, creating intermediate tables as needed.
    ///
    /// # Errors
    ///
    /// Returns `DevflowError::Config` if the path is empty or an intermediate
    /// segment already holds a non-table value.
    pub fn set_path(&mut self, path: &str, value: impl Into<Value>) -> Result<Option<Value>> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(DevflowError::config(format!("invalid key path '{}'", path)));
        }

        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| DevflowError::config("empty key path"))?;

        let mut table = &mut self.entries;
        for (depth, segment) in parents.iter().enumerate() {
            let slot = table
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            table = match slot {
                Value::Object(map) => map,
                other => {
                    return Err(DevflowError::config(format!(
                        "cannot set '{}': '{}' is a {}, not a table",
                        path,
                        segments[..=depth].join("."),
                        type_name(other)
                    )));
                }
            };
        }

        Ok(table.insert(last.to_string(), value.into()))
    }

    /// Removes a value by dotted path. Empty parent tables are left in place.
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        let segments: Vec<&str> = path.split('.').collect();
        let (last, parents) = segments.split_last()?;

        let mut table = &mut self.entries;
        for segment in parents {
            table = table.get_mut(*segment)?.as_object_mut()?;
        }
        table.remove(*last)
    }

    /// Moves the value at `from` to `to`.
    ///
    /// Returns `Ok(false)` without touching the document when `from` is absent.
    /// An existing value at `to` is overwritten.
    pub fn move_path(&mut self, from: &str, to: &str) -> Result<bool> {
        let Some(value) = self.get_path(from).cloned() else {
            return Ok(false);
        };
        self.set_path(to, value)?;
        self.remove_path(from);
        Ok(true)
    }

    /// Returns the raw `migration_version` marker for display.
    ///
    /// A marker of any other type than string or number reads as `None`; use
    /// [`ConfigDocument::checked_migration_version`] before acting on it.
    pub fn migration_version(&self) -> Option<String> {
        self.checked_migration_version().ok().flatten()
    }

    /// Returns the raw `migration_version` marker, rejecting unusable types.
    ///
    /// Numeric markers written by hand are accepted and read as their decimal
    /// representation.
    ///
    /// # Errors
    ///
    /// Returns `DevflowError::InvalidMigrationId` if the key holds a boolean,
    /// array, table or null.
    pub fn checked_migration_version(&self) -> Result<Option<String>> {
        match self.entries.get(MIGRATION_VERSION_KEY) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(DevflowError::invalid_migration_id(format!(
                "{} must be a string, found {}",
                MIGRATION_VERSION_KEY,
                type_name(other)
            ))),
        }
    }

    pub fn set_migration_version(&mut self, version: impl Into<String>) {
        self.entries
            .insert(MIGRATION_VERSION_KEY.to_string(), Value::String(version.into()));
    }
}

impl From<Map<String, Value>> for ConfigDocument {
    fn from(entries: Map<String, Value>) -> Self {
        Self::from_map(entries)
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> ConfigDocument {
        ConfigDocument::from_value(value).unwrap()
    }

    #[test]
    fn test_scope_parse_and_display() {
        assert_eq!("Global".parse::<Scope>().unwrap(), Scope::Global);
        assert_eq!("project".parse::<Scope>().unwrap(), Scope::Project);
        assert!("workspace".parse::<Scope>().is_err());
        assert_eq!(Scope::Project.to_string(), "project");
    }

    #[test]
    fn test_from_value_rejects_non_table() {
        let err = ConfigDocument::from_value(json!("text")).unwrap_err();
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn test_get_path_nested() {
        let d = doc(json!({"jira": {"auth": {"user": "mai"}}}));
        assert_eq!(d.get_path("jira.auth.user"), Some(&json!("mai")));
        assert_eq!(d.get_path("jira.auth.token"), None);
        assert_eq!(d.get_path("jira.auth.user.deeper"), None);
    }

    #[test]
    fn test_set_path_creates_tables() {
        let mut d = ConfigDocument::new();
        d.set_path("git.pull_request.draft", false).unwrap();
        assert_eq!(d.into_value(), json!({"git": {"pull_request": {"draft": false}}}));
    }

    #[test]
    fn test_set_path_through_scalar_fails() {
        let mut d = doc(json!({"git": "github"}));
        let err = d.set_path("git.provider", "github").unwrap_err();
        assert!(err.to_string().contains("'git' is a string"));
    }

    #[test]
    fn test_set_path_rejects_empty_segment() {
        let mut d = ConfigDocument::new();
        assert!(d.set_path("jira..url", "x").is_err());
        assert!(d.set_path("", "x").is_err());
    }

    #[test]
    fn test_move_path() {
        let mut d = doc(json!({"jira_url": "https://jira.example.com"}));
        assert!(d.move_path("jira_url", "jira.url").unwrap());
        assert_eq!(d.into_value(), json!({"jira": {"url": "https://jira.example.com"}}));
    }

    #[test]
    fn test_move_path_absent_is_noop() {
        let mut d = doc(json!({"other": 1}));
        assert!(!d.move_path("jira_url", "jira.url").unwrap());
        assert_eq!(d.into_value(), json!({"other": 1}));
    }

    #[test]
    fn test_migration_version_accessors() {
        let mut d = ConfigDocument::new();
        assert_eq!(d.migration_version(), None);
        d.set_migration_version("20240115093000000");
        assert_eq!(d.migration_version().as_deref(), Some("20240115093000000"));

        let numeric = doc(json!({"migration_version": 0}));
        assert_eq!(numeric.migration_version().as_deref(), Some("0"));
    }

    #[test]
    fn test_checked_migration_version_rejects_non_scalar() {
        for marker in [json!(true), json!(["1"]), json!({"v": "1"})] {
            let d = doc(json!({"migration_version": marker}));
            let err = d.checked_migration_version().unwrap_err();
            assert!(matches!(err, DevflowError::InvalidMigrationId(_)));
            assert_eq!(d.migration_version(), None);
        }
        assert_eq!(ConfigDocument::new().checked_migration_version().unwrap(), None);
    }
}
