//! Migrations for the per-repository configuration document.

use crate::migration::id::MigrationId;
use crate::migration::traits::{Migration, TransformError};
use devflow_core::{ConfigDocument, DevflowError, Scope};
use serde_json::Value;

/// Moves `branch_prefix` under the `[git]` table.
#[derive(Debug, Clone)]
pub struct BranchPrefixMigration {
    id: MigrationId,
}

impl BranchPrefixMigration {
    pub const ID: &'static str = "20240201100000000";

    pub fn new() -> Result<Self, DevflowError> {
        Ok(Self {
            id: MigrationId::parse(Self::ID)?,
        })
    }
}

impl Migration for BranchPrefixMigration {
    fn id(&self) -> MigrationId {
        self.id.clone()
    }

    fn description(&self) -> &str {
        "Move branch_prefix to git.branch_prefix"
    }

    fn scope(&self) -> Scope {
        Scope::Project
    }

    fn is_prerequisite(&self) -> bool {
        true
    }

    fn up(&self, document: &ConfigDocument) -> Result<ConfigDocument, TransformError> {
        let mut migrated = document.clone();
        migrated.move_path("branch_prefix", "git.branch_prefix")?;
        Ok(migrated)
    }

    fn down(&self, document: &ConfigDocument) -> Result<ConfigDocument, TransformError> {
        let mut reverted = document.clone();
        reverted.move_path("git.branch_prefix", "branch_prefix")?;
        Ok(reverted)
    }
}

/// Adds `pull_request.draft = false` when the project never chose a value.
#[derive(Debug, Clone)]
pub struct PullRequestDraftDefaultMigration {
    id: MigrationId,
}

impl PullRequestDraftDefaultMigration {
    pub const ID: &'static str = "20240815143000000";

    pub fn new() -> Result<Self, DevflowError> {
        Ok(Self {
            id: MigrationId::parse(Self::ID)?,
        })
    }
}

impl Migration for PullRequestDraftDefaultMigration {
    fn id(&self) -> MigrationId {
        self.id.clone()
    }

    fn description(&self) -> &str {
        "Default pull_request.draft to false"
    }

    fn scope(&self) -> Scope {
        Scope::Project
    }

    fn up(&self, document: &ConfigDocument) -> Result<ConfigDocument, TransformError> {
        match document.get_path("pull_request.draft") {
            Some(Value::Bool(_)) => Ok(document.clone()),
            Some(_) => Err(TransformError::unexpected_type(
                "pull_request.draft",
                "boolean",
            )),
            None => {
                let mut migrated = document.clone();
                migrated.set_path("pull_request.draft", false)?;
                Ok(migrated)
            }
        }
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
    fn test_branch_prefix_moved() {
        let migration = BranchPrefixMigration::new().unwrap();
        let migrated = migration
            .up(&doc(json!({"branch_prefix": "feature/", "git": {"remote": "origin"}})))
            .unwrap();
        assert_eq!(
            migrated.into_value(),
            json!({"git": {"remote": "origin", "branch_prefix": "feature/"}})
        );
    }

    #[test]
    fn test_branch_prefix_fails_when_git_is_scalar() {
        let migration = BranchPrefixMigration::new().unwrap();
        let err = migration
            .up(&doc(json!({"branch_prefix": "feature/", "git": "origin"})))
            .unwrap_err();
        assert!(err.message().contains("not a table"));
    }

    #[test]
    fn test_branch_prefix_round_trip_down() {
        let migration = BranchPrefixMigration::new().unwrap();
        let original = doc(json!({"branch_prefix": "fix/"}));
        let reverted = migration.down(&migration.up(&original).unwrap()).unwrap();
        assert_eq!(reverted.get("branch_prefix"), Some(&json!("fix/")));
    }

    #[test]
    fn test_draft_default_added_once() {
        let migration = PullRequestDraftDefaultMigration::new().unwrap();
        let migrated = migration.up(&ConfigDocument::new()).unwrap();
        assert_eq!(migrated.get_path("pull_request.draft"), Some(&json!(false)));

        let chosen = doc(json!({"pull_request": {"draft": true}}));
        assert_eq!(migration.up(&chosen).unwrap(), chosen);
    }

    #[test]
    fn test_draft_default_rejects_non_boolean() {
        let migration = PullRequestDraftDefaultMigration::new().unwrap();
        assert!(migration
            .up(&doc(json!({"pull_request": {"draft": "yes"}})))
            .is_err());
    }
}
