//! Migrations for the user-wide configuration document.

use crate::migration::id::MigrationId;
use crate::migration::traits::{Migration, TransformError};
use devflow_core::{ConfigDocument, DevflowError, Scope};
use serde_json::Value;

const JIRA_KEYS: [(&str, &str); 3] = [
    ("jira_url", "jira.url"),
    ("jira_user", "jira.user"),
    ("jira_token", "jira.token"),
];

/// Moves the flat `jira_*` keys into a `[jira]` table.
///
/// Every Jira command reads the table layout, so nothing may run until this
/// one has succeeded.
#[derive(Debug, Clone)]
pub struct JiraSettingsTableMigration {
    id: MigrationId,
}

impl JiraSettingsTableMigration {
    pub const ID: &'static str = "20240115093000000";

    pub fn new() -> Result<Self, DevflowError> {
        Ok(Self {
            id: MigrationId::parse(Self::ID)?,
        })
    }
}

impl Migration for JiraSettingsTableMigration {
    fn id(&self) -> MigrationId {
        self.id.clone()
    }

    fn description(&self) -> &str {
        "Move jira_url, jira_user and jira_token into the [jira] table"
    }

    fn scope(&self) -> Scope {
        Scope::Global
    }

    fn is_prerequisite(&self) -> bool {
        true
    }

    fn up(&self, document: &ConfigDocument) -> Result<ConfigDocument, TransformError> {
        if let Some(url) = document.get("jira_url") {
            if !url.is_string() {
                return Err(TransformError::unexpected_type("jira_url", "string"));
            }
        }

        let mut migrated = document.clone();
        for (from, to) in JIRA_KEYS {
            migrated.move_path(from, to)?;
        }
        Ok(migrated)
    }

    fn down(&self, document: &ConfigDocument) -> Result<ConfigDocument, TransformError> {
        let mut reverted = document.clone();
        for (flat, nested) in JIRA_KEYS {
            reverted.move_path(nested, flat)?;
        }
        if matches!(reverted.get("jira"), Some(Value::Object(table)) if table.is_empty()) {
            reverted.remove("jira");
        }
        Ok(reverted)
    }
}

/// Rewrites short git provider aliases to their canonical names.
#[derive(Debug, Clone)]
pub struct NormalizeGitProviderMigration {
    id: MigrationId,
}

impl NormalizeGitProviderMigration {
    pub const ID: &'static str = "20240302120000000";

    pub fn new() -> Result<Self, DevflowError> {
        Ok(Self {
            id: MigrationId::parse(Self::ID)?,
        })
    }

    fn canonical(provider: &str) -> Option<&'static str> {
        match provider.to_ascii_lowercase().as_str() {
            "gh" => Some("github"),
            "gl" => Some("gitlab"),
            "bb" => Some("bitbucket"),
            _ => None,
        }
    }
}

impl Migration for NormalizeGitProviderMigration {
    fn id(&self) -> MigrationId {
        self.id.clone()
    }

    fn description(&self) -> &str {
        "Normalize git.provider aliases (gh, gl, bb)"
    }

    fn scope(&self) -> Scope {
        Scope::Global
    }

    fn up(&self, document: &ConfigDocument) -> Result<ConfigDocument, TransformError> {
        let provider = match document.get_path("git.provider") {
            None => return Ok(document.clone()),
            Some(Value::String(provider)) => provider,
            Some(_) => return Err(TransformError::unexpected_type("git.provider", "string")),
        };

        let Some(canonical) = Self::canonical(provider) else {
            return Ok(document.clone());
        };

        let mut migrated = document.clone();
        migrated.set_path("git.provider", canonical)?;
        Ok(migrated)
    }
}

/// Removes the `update_channel` key; self-update only follows stable releases.
#[derive(Debug, Clone)]
pub struct DropUpdateChannelMigration {
    id: MigrationId,
}

impl DropUpdateChannelMigration {
    pub const ID: &'static str = "20240610081500000";

    pub fn new() -> Result<Self, DevflowError> {
        Ok(Self {
            id: MigrationId::parse(Self::ID)?,
        })
    }
}

impl Migration for DropUpdateChannelMigration {
    fn id(&self) -> MigrationId {
        self.id.clone()
    }

    fn description(&self) -> &str {
        "Remove the obsolete update_channel setting"
    }

    fn scope(&self) -> Scope {
        Scope::Global
    }

    fn up(&self, document: &ConfigDocument) -> Result<ConfigDocument, TransformError> {
        let mut migrated = document.clone();
        migrated.remove("update_channel");
        Ok(migrated)
    }

    // The removed value is gone; "stable" is the only channel that still exists.
    fn down(&self, document: &ConfigDocument) -> Result<ConfigDocument, TransformError> {
        let mut reverted = document.clone();
        if !reverted.contains("update_channel") {
            reverted.set("update_channel", "stable");
        }
        Ok(reverted)
    }
}
