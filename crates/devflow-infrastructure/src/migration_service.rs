//! Configuration migration service.
//!
//! This is the caller side of the migration engine: it loads a document from
//! the store, asks the registry what is pending, and hands the list to the
//! executor with a `persist` callback that writes back to the same path.

use crate::migration::{
    CatalogSource, INITIAL_VERSION, MigrationExecutor, MigrationId, MigrationLogger,
    MigrationOutcome, MigrationRegistry, TracingLogger, VersionMarker, catalog,
};
use devflow_core::error::Result;
use devflow_core::{ConfigDocument, ConfigRepository, DevflowError, MigrationFailure, Scope};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A migration that has not been applied to a document yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMigration {
    pub id: MigrationId,
    pub description: String,
    pub prerequisite: bool,
}

/// Migration state of one document.
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub scope: Scope,
    pub marker: VersionMarker,
    pub latest: Option<MigrationId>,
    pub pending: Vec<PendingMigration>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Result of `initialize`.
#[derive(Debug, Clone)]
pub enum InitOutcome {
    /// No document existed; defaults were written at the latest version.
    Created(ConfigDocument),
    /// A document already existed and was migrated instead.
    Migrated(MigrationOutcome),
}

/// Runs configuration migrations against documents in a store.
pub struct ConfigMigrationService {
    store: Arc<dyn ConfigRepository>,
    registry: MigrationRegistry,
    executor: MigrationExecutor,
}

impl ConfigMigrationService {
    pub fn new(
        store: Arc<dyn ConfigRepository>,
        source: Arc<dyn CatalogSource>,
        logger: Arc<dyn MigrationLogger>,
    ) -> Self {
        Self {
            store,
            registry: MigrationRegistry::new(source, logger.clone()),
            executor: MigrationExecutor::new(logger),
        }
    }

    /// Service over the shipped catalog, logging through `tracing`.
    pub fn with_builtin_catalog(store: Arc<dyn ConfigRepository>) -> Self {
        Self::new(store, Arc::new(catalog::builtin()), Arc::new(TracingLogger))
    }

    /// Reports the marker, newest known identity and pending migrations.
    pub fn status(&self, scope: Scope, path: &Path) -> Result<MigrationStatus> {
        let document = self.store.read(path)?;
        let marker = Self::marker_of(&document)?;
        let catalog = self.registry.discover(scope);
        let latest = catalog.last().map(|m| m.id());

        let pending = self
            .registry
            .pending(&catalog, &marker)
            .iter()
            .map(|m| PendingMigration {
                id: m.id(),
                description: m.description().to_string(),
                prerequisite: m.is_prerequisite(),
            })
            .collect();

        Ok(MigrationStatus {
            scope,
            marker,
            latest,
            pending,
        })
    }

    /// Applies every pending migration of `scope` to the document at `path`.
    ///
    /// The document is written after each successful step. When nothing is
    /// pending the file is left untouched. A missing file is never created
    /// here; that is `initialize`'s job, since it also writes the defaults.
    ///
    /// # Errors
    ///
    /// - `DevflowError::NotFound` if there is no document at `path`
    /// - The document cannot be read or its marker is malformed
    /// - A prerequisite migration fails or a write fails (`DevflowError::Migration`)
    pub fn migrate(&self, scope: Scope, path: &Path) -> Result<MigrationOutcome> {
        if !self.store.exists(path) {
            return Err(DevflowError::not_found(
                "configuration file",
                path.display().to_string(),
            ));
        }

        let document = self.store.read(path)?;
        let marker = Self::marker_of(&document)?;
        let catalog = self.registry.discover(scope);
        let pending = self.registry.pending(&catalog, &marker);

        if pending.is_empty() {
            tracing::debug!(
                "[Migration] {} configuration at {} is up to date (version {})",
                scope,
                path.display(),
                marker
            );
            return Ok(MigrationOutcome {
                document,
                applied: Vec::new(),
                skipped: Vec::new(),
            });
        }

        tracing::info!(
            "[Migration] Migrating {} configuration at {} from version {} ({} pending)",
            scope,
            path.display(),
            marker,
            pending.len()
        );

        let outcome = self
            .executor
            .apply(&pending, document, |doc| self.store.write(path, doc))?;
        Ok(outcome)
    }

    /// Migrates several documents in order, each against its own catalog.
    ///
    /// Targets whose file does not exist yet are skipped and left out of the
    /// result. A fatal error in one document stops before the next one is
    /// touched.
    pub fn migrate_all(&self, targets: &[(Scope, PathBuf)]) -> Result<Vec<(Scope, MigrationOutcome)>> {
        let mut outcomes = Vec::with_capacity(targets.len());
        for (scope, path) in targets {
            if !self.store.exists(path) {
                tracing::info!(
                    "[Migration] No {} configuration at {}, skipping",
                    scope,
                    path.display()
                );
                continue;
            }
            outcomes.push((*scope, self.migrate(*scope, path)?));
        }
        Ok(outcomes)
    }

    /// Creates the document at `path` from `defaults`, or migrates it if it
    /// already exists.
    ///
    /// Defaults are written in the newest layout, so a fresh document is
    /// stamped with the latest catalog identity instead of replaying history.
    pub fn initialize(
        &self,
        scope: Scope,
        path: &Path,
        defaults: ConfigDocument,
    ) -> Result<InitOutcome> {
        if self.store.exists(path) {
            tracing::info!(
                "[Migration] {} configuration already exists at {}, migrating instead",
                scope,
                path.display()
            );
            return Ok(InitOutcome::Migrated(self.migrate(scope, path)?));
        }

        let mut document = defaults;
        let version = self
            .registry
            .latest(scope)
            .map(String::from)
            .unwrap_or_else(|| INITIAL_VERSION.to_string());
        document.set_migration_version(version);

        self.store.write(path, &document)?;
        tracing::info!(
            "[Migration] Created {} configuration at {}",
            scope,
            path.display()
        );

        Ok(InitOutcome::Created(document))
    }

    /// Reverses the most recently applied migration of a document.
    ///
    /// Runs that migration's `down` and resets the marker to the initial
    /// marker. The marker alone cannot tell which older migrations were
    /// applied (an optional one may have been skipped), so the next run
    /// replays the whole catalog and relies on `up` being a no-op for
    /// layouts it already finds in place. Only one step is reversed per call.
    pub fn rollback(&self, scope: Scope, path: &Path, id: &MigrationId) -> Result<ConfigDocument> {
        let document = self.store.read(path)?;
        let marker = Self::marker_of(&document)?;

        if marker.applied() != Some(id) {
            return Err(DevflowError::migration(
                MigrationFailure::Rollback,
                Some(id.to_string()),
                format!(
                    "cannot reverse {}: the {} configuration is at version {}, only the latest applied migration can be reversed",
                    id, scope, marker
                ),
            ));
        }

        let catalog = self.registry.discover(scope);
        let migration = catalog
            .iter()
            .find(|m| &m.id() == id)
            .ok_or_else(|| DevflowError::not_found("migration", id.to_string()))?;

        let mut reverted = migration.down(&document).map_err(|e| {
            DevflowError::migration(
                MigrationFailure::Rollback,
                Some(id.to_string()),
                format!("reversing {} ({}) failed: {}", id, migration.description(), e),
            )
        })?;

        let previous = VersionMarker::Initial;
        reverted.set_migration_version(previous.as_stored());

        self.store.write(path, &reverted)?;
        tracing::info!(
            "[Migration] Reversed {} ({}); {} configuration now at version {}",
            id,
            migration.description(),
            scope,
            previous
        );

        Ok(reverted)
    }

    fn marker_of(document: &ConfigDocument) -> Result<VersionMarker> {
        VersionMarker::of(document)
    }
}

impl std::fmt::Debug for ConfigMigrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigMigrationService")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Default document for a freshly initialized scope, in the newest layout.
pub fn default_document(scope: Scope) -> ConfigDocument {
    let value = match scope {
        Scope::Global => json!({
            "language": "en",
            "git": {"provider": "github", "remote": "origin"},
            "jira": {"url": ""}
        }),
        Scope::Project => json!({
            "git": {"branch_prefix": "feature/"},
            "pull_request": {"draft": false}
        }),
    };
    match value {
        serde_json::Value::Object(map) => ConfigDocument::from_map(map),
        _ => ConfigDocument::new(),
    }
}
