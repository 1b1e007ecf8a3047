//! Migration catalogs.
//!
//! A catalog is a static list of descriptor factories per scope, built once at
//! startup. The registry materializes each entry on every discovery pass, so a
//! broken entry only ever costs itself.

mod global;
mod project;

use super::traits::Migration;
use devflow_core::{DevflowError, Scope};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use global::{
    DropUpdateChannelMigration, JiraSettingsTableMigration, NormalizeGitProviderMigration,
};
pub use project::{BranchPrefixMigration, PullRequestDraftDefaultMigration};

/// Builds one migration instance.
pub type MigrationFactory =
    Arc<dyn Fn() -> Result<Box<dyn Migration>, DevflowError> + Send + Sync>;

/// One candidate in a catalog.
#[derive(Clone)]
pub struct CatalogEntry {
    name: String,
    factory: MigrationFactory,
}

impl CatalogEntry {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Migration>, DevflowError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instantiates the migration behind this entry.
    pub fn materialize(&self) -> Result<Box<dyn Migration>, DevflowError> {
        (self.factory)()
    }
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Supplies the raw candidates for a scope.
pub trait CatalogSource: Send + Sync {
    /// Returns every candidate filed under `scope`.
    ///
    /// Entries may still declare a different scope; the registry filters them.
    fn entries(&self, scope: Scope) -> Vec<CatalogEntry>;
}

/// In-memory catalog keyed by scope.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: HashMap<Scope, Vec<CatalogEntry>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files an entry under `scope`.
    pub fn with_entry(mut self, scope: Scope, entry: CatalogEntry) -> Self {
        self.entries.entry(scope).or_default().push(entry);
        self
    }

    pub fn register(&mut self, scope: Scope, entry: CatalogEntry) {
        self.entries.entry(scope).or_default().push(entry);
    }

    pub fn len(&self, scope: Scope) -> usize {
        self.entries.get(&scope).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}

impl CatalogSource for StaticCatalog {
    fn entries(&self, scope: Scope) -> Vec<CatalogEntry> {
        self.entries.get(&scope).cloned().unwrap_or_default()
    }
}

/// Returns the catalog shipped with devflow.
///
/// New migrations are appended here. Order does not matter; the registry
/// sorts by identity.
pub fn builtin() -> StaticCatalog {
    StaticCatalog::new()
        // Global
        .with_entry(
            Scope::Global,
            CatalogEntry::new("jira_settings_table", || {
                Ok(Box::new(JiraSettingsTableMigration::new()?))
            }),
        )
        .with_entry(
            Scope::Global,
            CatalogEntry::new("normalize_git_provider", || {
                Ok(Box::new(NormalizeGitProviderMigration::new()?))
            }),
        )
        .with_entry(
            Scope::Global,
            CatalogEntry::new("drop_update_channel", || {
                Ok(Box::new(DropUpdateChannelMigration::new()?))
            }),
        )
        // Project
        .with_entry(
            Scope::Project,
            CatalogEntry::new("branch_prefix", || Ok(Box::new(BranchPrefixMigration::new()?))),
        )
        .with_entry(
            Scope::Project,
            CatalogEntry::new("pull_request_draft_default", || {
                Ok(Box::new(PullRequestDraftDefaultMigration::new()?))
            }),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::id::compare;
    use std::cmp::Ordering;

    #[test]
    fn test_builtin_entries_materialize_with_matching_scope() {
        let catalog = builtin();
        for scope in Scope::all() {
            for entry in catalog.entries(*scope) {
                let migration = entry.materialize().unwrap();
                assert_eq!(migration.scope(), *scope, "entry {} filed under wrong scope", entry.name());
                assert!(!migration.description().is_empty());
            }
        }
    }

    #[test]
    fn test_builtin_ids_unique_per_scope() {
        let catalog = builtin();
        for scope in Scope::all() {
            let mut ids: Vec<_> = catalog
                .entries(*scope)
                .iter()
                .map(|e| e.materialize().unwrap().id())
                .collect();
            ids.sort_by(compare);
            for pair in ids.windows(2) {
                assert_eq!(compare(&pair[0], &pair[1]), Ordering::Less);
            }
        }
    }

    #[test]
    fn test_static_catalog_len() {
        let catalog = builtin();
        assert_eq!(catalog.len(Scope::Global), 3);
        assert_eq!(catalog.len(Scope::Project), 2);
        assert!(StaticCatalog::new().is_empty());
    }
}
