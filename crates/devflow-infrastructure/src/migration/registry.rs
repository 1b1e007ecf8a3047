//! Migration registry: discovery, filtering and ordering.
//!
//! Discovery never fails. A catalog entry that cannot be instantiated, breaks
//! the contract, or duplicates an identity is logged and skipped, so one
//! broken migration can never keep the user from running a command.

use super::catalog::{CatalogEntry, CatalogSource};
use super::id::{MigrationId, VersionMarker, compare};
use super::logger::MigrationLogger;
use super::traits::Migration;
use devflow_core::{DevflowError, Scope};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Why a catalog entry was left out of a discovery pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("catalog entry '{entry}' could not be instantiated: {source}")]
    Instantiation {
        entry: String,
        #[source]
        source: DevflowError,
    },

    #[error("catalog entry '{entry}' does not satisfy the migration contract: {reason}")]
    Contract { entry: String, reason: String },

    #[error("catalog entry '{entry}' declares scope {declared} but is filed under {requested}")]
    ScopeMismatch {
        entry: String,
        declared: Scope,
        requested: Scope,
    },

    #[error("catalog entry '{entry}' reuses migration id {id}")]
    DuplicateId { entry: String, id: MigrationId },
}

/// Discovers the migrations of a scope and computes what is pending.
///
/// # Example
///
/// ```ignore
/// let registry = MigrationRegistry::new(Arc::new(catalog::builtin()), logger);
/// let catalog = registry.discover(Scope::Global);
/// let pending = registry.pending(&catalog, &VersionMarker::parse(Some("0"))?);
/// ```
pub struct MigrationRegistry {
    source: Arc<dyn CatalogSource>,
    logger: Arc<dyn MigrationLogger>,
}

impl MigrationRegistry {
    pub fn new(source: Arc<dyn CatalogSource>, logger: Arc<dyn MigrationLogger>) -> Self {
        Self { source, logger }
    }

    /// Returns every valid migration of `scope`, sorted ascending by identity.
    ///
    /// Entries declaring another scope are invisible here. Entries that fail
    /// to instantiate, break the contract or reuse an identity are skipped with
    /// a warning; the first entry with a given identity wins.
    pub fn discover(&self, scope: Scope) -> Vec<Arc<dyn Migration>> {
        let mut seen: HashSet<MigrationId> = HashSet::new();
        let mut catalog: Vec<Arc<dyn Migration>> = Vec::new();

        for entry in self.source.entries(scope) {
            match Self::materialize(&entry, scope) {
                Ok(migration) => {
                    let id = migration.id();
                    if !seen.insert(id.clone()) {
                        let err = DiscoveryError::DuplicateId {
                            entry: entry.name().to_string(),
                            id,
                        };
                        self.logger.warn(&format!("Skipping {}", err));
                        continue;
                    }
                    catalog.push(Arc::from(migration));
                }
                Err(err @ DiscoveryError::ScopeMismatch { .. }) => {
                    self.logger.debug(&format!("Ignoring {}", err));
                }
                Err(err) => {
                    self.logger.warn(&format!("Skipping {}", err));
                }
            }
        }

        catalog.sort_by(|a, b| compare(&a.id(), &b.id()));

        self.logger.debug(&format!(
            "Discovered {} {} migration(s)",
            catalog.len(),
            scope
        ));

        catalog
    }

    /// Returns the migrations of `catalog` not yet reflected in `marker`.
    ///
    /// With the initial marker the whole catalog is pending. Otherwise only
    /// identities strictly greater than the marker are. The result is sorted
    /// ascending regardless of the input order.
    pub fn pending(
        &self,
        catalog: &[Arc<dyn Migration>],
        marker: &VersionMarker,
    ) -> Vec<Arc<dyn Migration>> {
        let mut pending: Vec<Arc<dyn Migration>> = catalog
            .iter()
            .filter(|m| marker.is_behind(&m.id()))
            .cloned()
            .collect();
        pending.sort_by(|a, b| compare(&a.id(), &b.id()));

        self.logger.debug(&format!(
            "{} migration(s) pending after version {}",
            pending.len(),
            marker
        ));

        pending
    }

    /// Returns the newest identity known for `scope`.
    pub fn latest(&self, scope: Scope) -> Option<MigrationId> {
        self.discover(scope).last().map(|m| m.id())
    }

    /// Looks up a single discovered migration by identity.
    pub fn find(&self, scope: Scope, id: &MigrationId) -> Option<Arc<dyn Migration>> {
        self.discover(scope).into_iter().find(|m| &m.id() == id)
    }

    fn materialize(entry: &CatalogEntry, scope: Scope) -> Result<Box<dyn Migration>, DiscoveryError> {
        let migration = entry
            .materialize()
            .map_err(|source| DiscoveryError::Instantiation {
                entry: entry.name().to_string(),
                source,
            })?;

        if migration.description().trim().is_empty() {
            return Err(DiscoveryError::Contract {
                entry: entry.name().to_string(),
                reason: "description is empty".to_string(),
            });
        }

        if migration.scope() != scope {
            return Err(DiscoveryError::ScopeMismatch {
                entry: entry.name().to_string(),
                declared: migration.scope(),
                requested: scope,
            });
        }

        Ok(migration)
    }
}

impl std::fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::catalog::StaticCatalog;
    use crate::migration::logger::testing::{Level, RecordingLogger};
    use crate::migration::traits::TransformError;
    use devflow_core::ConfigDocument;

    #[derive(Debug)]
    struct MockMigration {
        id: &'static str,
        scope: Scope,
        desc: &'static str,
    }

    impl Migration for MockMigration {
        fn id(&self) -> MigrationId {
            MigrationId::parse(self.id).unwrap()
        }

        fn description(&self) -> &str {
            self.desc
        }

        fn scope(&self) -> Scope {
            self.scope
        }

        fn up(&self, document: &ConfigDocument) -> Result<ConfigDocument, TransformError> {
            Ok(document.clone())
        }
    }

    fn entry(id: &'static str, scope: Scope) -> CatalogEntry {
        CatalogEntry::new(format!("m{}", id), move || {
            Ok(Box::new(MockMigration {
                id,
                scope,
                desc: "mock",
            }))
        })
    }

    fn id(value: &str) -> MigrationId {
        MigrationId::parse(value).unwrap()
    }

    fn ids(migrations: &[Arc<dyn Migration>]) -> Vec<String> {
        migrations.iter().map(|m| m.id().to_string()).collect()
    }

    fn registry(catalog: StaticCatalog) -> (MigrationRegistry, Arc<RecordingLogger>) {
        let logger = Arc::new(RecordingLogger::default());
        (MigrationRegistry::new(Arc::new(catalog), logger.clone()), logger)
    }

    const A: &str = "20240101000000000";
    const B: &str = "20240202000000000";
    const C: &str = "20240303000000000";

    #[test]
    fn test_discover_sorts_by_id() {
        let (registry, _) = registry(
            StaticCatalog::new()
                .with_entry(Scope::Global, entry(C, Scope::Global))
                .with_entry(Scope::Global, entry(A, Scope::Global))
                .with_entry(Scope::Global, entry(B, Scope::Global)),
        );

        assert_eq!(ids(&registry.discover(Scope::Global)), vec![A, B, C]);
    }

    #[test]
    fn test_discover_is_repeatable() {
        let (registry, _) = registry(
            StaticCatalog::new()
                .with_entry(Scope::Global, entry(B, Scope::Global))
                .with_entry(Scope::Global, entry(A, Scope::Global)),
        );

        assert_eq!(
            ids(&registry.discover(Scope::Global)),
            ids(&registry.discover(Scope::Global))
        );
    }

    #[test]
    fn test_discover_excludes_scope_mismatch_silently() {
        let (registry, logger) = registry(
            StaticCatalog::new()
                .with_entry(Scope::Global, entry(A, Scope::Global))
                .with_entry(Scope::Global, entry(B, Scope::Project)),
        );

        assert_eq!(ids(&registry.discover(Scope::Global)), vec![A]);
        assert!(logger.messages(Level::Warn).is_empty());
        assert!(registry.discover(Scope::Project).is_empty());
    }

    #[test]
    fn test_discover_skips_broken_entry() {
        let (registry, logger) = registry(
            StaticCatalog::new()
                .with_entry(Scope::Global, entry(A, Scope::Global))
                .with_entry(
                    Scope::Global,
                    CatalogEntry::new("broken", || {
                        Err(DevflowError::invalid_migration_id("2024"))
                    }),
                )
                .with_entry(Scope::Global, entry(B, Scope::Global)),
        );

        assert_eq!(ids(&registry.discover(Scope::Global)), vec![A, B]);
        let warnings = logger.messages(Level::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("broken"));
    }

    #[test]
    fn test_discover_skips_contract_violation() {
        let (registry, logger) = registry(StaticCatalog::new().with_entry(
            Scope::Global,
            CatalogEntry::new("nameless", || {
                Ok(Box::new(MockMigration {
                    id: A,
                    scope: Scope::Global,
                    desc: "  ",
                }))
            }),
        ));

        assert!(registry.discover(Scope::Global).is_empty());
        assert!(logger.messages(Level::Warn)[0].contains("description is empty"));
    }

    #[test]
    fn test_discover_skips_duplicate_ids() {
        let (registry, logger) = registry(
            StaticCatalog::new()
                .with_entry(Scope::Global, entry(A, Scope::Global))
                .with_entry(Scope::Global, entry(A, Scope::Global)),
        );

        assert_eq!(ids(&registry.discover(Scope::Global)), vec![A]);
        assert!(logger.messages(Level::Warn)[0].contains("reuses migration id"));
    }

    #[test]
    fn test_pending_with_sentinel_returns_all() {
        let (registry, _) = registry(
            StaticCatalog::new()
                .with_entry(Scope::Global, entry(B, Scope::Global))
                .with_entry(Scope::Global, entry(A, Scope::Global)),
        );
        let catalog = registry.discover(Scope::Global);

        let pending = registry.pending(&catalog, &VersionMarker::parse(Some("0")).unwrap());
        assert_eq!(ids(&pending), vec![A, B]);

        let pending = registry.pending(&catalog, &VersionMarker::parse(Some("")).unwrap());
        assert_eq!(ids(&pending), vec![A, B]);
    }

    #[test]
    fn test_pending_strictly_after_marker() {
        let (registry, _) = registry(
            StaticCatalog::new()
                .with_entry(Scope::Global, entry(A, Scope::Global))
                .with_entry(Scope::Global, entry(B, Scope::Global))
                .with_entry(Scope::Global, entry(C, Scope::Global)),
        );
        let catalog = registry.discover(Scope::Global);

        let pending = registry.pending(&catalog, &VersionMarker::from(id(A)));
        assert_eq!(ids(&pending), vec![B, C]);

        let pending = registry.pending(&catalog, &VersionMarker::from(id(C)));
        assert!(pending.is_empty());

        // A marker between catalog members still splits correctly
        let pending = registry.pending(&catalog, &VersionMarker::from(id("20240215000000000")));
        assert_eq!(ids(&pending), vec![C]);
    }

    #[test]
    fn test_pending_sorts_unsorted_input() {
        let (registry, _) = registry(StaticCatalog::new());
        let unsorted: Vec<Arc<dyn Migration>> = vec![
            Arc::new(MockMigration { id: C, scope: Scope::Global, desc: "c" }),
            Arc::new(MockMigration { id: A, scope: Scope::Global, desc: "a" }),
            Arc::new(MockMigration { id: B, scope: Scope::Global, desc: "b" }),
        ];

        let pending = registry.pending(&unsorted, &VersionMarker::Initial);
        assert_eq!(ids(&pending), vec![A, B, C]);
    }

    #[test]
    fn test_latest_and_find() {
        let (registry, _) = registry(
            StaticCatalog::new()
                .with_entry(Scope::Project, entry(B, Scope::Project))
                .with_entry(Scope::Project, entry(A, Scope::Project)),
        );

        assert_eq!(registry.latest(Scope::Project), Some(id(B)));
        assert_eq!(registry.latest(Scope::Global), None);
        assert!(registry.find(Scope::Project, &id(A)).is_some());
        assert!(registry.find(Scope::Project, &id(C)).is_none());
    }
}
