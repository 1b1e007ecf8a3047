//! Sequential migration executor.
//!
//! Applies an ordered list of migrations to one document, persisting after
//! every successful step. Failures are split by the prerequisite flag:
//! prerequisite failures stop the run, optional failures are skipped with a
//! warning. A skipped step is retried on the next invocation only while no
//! newer migration has been applied after it.

use super::id::{MigrationId, compare};
use super::logger::MigrationLogger;
use super::traits::{Migration, TransformError};
use devflow_core::{ConfigDocument, DevflowError, MigrationFailure};
use std::cmp::Ordering;
use std::sync::Arc;
use thiserror::Error;

/// Failures that stop a migration run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    /// A prerequisite migration failed; the calling workflow must abort.
    #[error("Prerequisite migration {id} ({description}) failed: {source}")]
    Prerequisite {
        id: MigrationId,
        description: String,
        #[source]
        source: TransformError,
    },

    /// The document could not be persisted after a successful transform.
    #[error("Could not save configuration after migration {id} ({description}): {source}")]
    Persistence {
        id: MigrationId,
        description: String,
        #[source]
        source: DevflowError,
    },
}

impl MigrationError {
    /// Identity of the migration that stopped the run.
    pub fn id(&self) -> &MigrationId {
        match self {
            Self::Prerequisite { id, .. } | Self::Persistence { id, .. } => id,
        }
    }
}

impl From<MigrationError> for DevflowError {
    fn from(err: MigrationError) -> Self {
        let kind = match err {
            MigrationError::Prerequisite { .. } => MigrationFailure::Prerequisite,
            MigrationError::Persistence { .. } => MigrationFailure::Persistence,
        };
        DevflowError::migration(kind, Some(err.id().to_string()), err.to_string())
    }
}

/// An optional migration that failed and was left for the next run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMigration {
    pub id: MigrationId,
    pub description: String,
    pub reason: String,
    /// A newer migration was applied after this one, so the marker has moved
    /// past it and later runs will not select it again.
    pub superseded: bool,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    /// The document as persisted after the last successful step.
    pub document: ConfigDocument,
    /// Identities applied during this run, in order.
    pub applied: Vec<MigrationId>,
    /// Optional migrations that failed during this run.
    pub skipped: Vec<SkippedMigration>,
}

impl MigrationOutcome {
    /// True if every attempted migration succeeded.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub struct MigrationExecutor {
    logger: Arc<dyn MigrationLogger>,
}

impl MigrationExecutor {
    pub fn new(logger: Arc<dyn MigrationLogger>) -> Self {
        Self { logger }
    }

    /// Applies `migrations` in the given order.
    ///
    /// After each successful `up` the document's `migration_version` is set to
    /// that migration's identity and `persist` is called before the next step
    /// starts. Completed steps are never rolled back.
    ///
    /// # Errors
    ///
    /// - `MigrationError::Prerequisite` when a prerequisite migration fails.
    ///   Its marker is not advanced and later migrations are not attempted.
    /// - `MigrationError::Persistence` when `persist` fails, whatever the
    ///   migration's prerequisite flag.
    pub fn apply<F>(
        &self,
        migrations: &[Arc<dyn Migration>],
        mut document: ConfigDocument,
        mut persist: F,
    ) -> Result<MigrationOutcome, MigrationError>
    where
        F: FnMut(&ConfigDocument) -> devflow_core::error::Result<()>,
    {
        let total = migrations.len();
        let mut applied = Vec::new();
        let mut skipped = Vec::new();

        for (i, migration) in migrations.iter().enumerate() {
            let id = migration.id();
            self.logger.info(&format!(
                "Step {}/{}: applying {} ({})",
                i + 1,
                total,
                id,
                migration.description()
            ));

            let mut migrated = match migration.up(&document) {
                Ok(migrated) => migrated,
                Err(source) if migration.is_prerequisite() => {
                    self.report_skipped(&mut skipped, applied.last());
                    let err = MigrationError::Prerequisite {
                        id,
                        description: migration.description().to_string(),
                        source,
                    };
                    self.logger.error(&err.to_string());
                    return Err(err);
                }
                Err(source) => {
                    skipped.push(SkippedMigration {
                        id,
                        description: migration.description().to_string(),
                        reason: source.to_string(),
                        superseded: false,
                    });
                    continue;
                }
            };

            migrated.set_migration_version(id.as_str());

            if let Err(source) = persist(&migrated) {
                self.report_skipped(&mut skipped, applied.last());
                let err = MigrationError::Persistence {
                    id,
                    description: migration.description().to_string(),
                    source,
                };
                self.logger.error(&err.to_string());
                return Err(err);
            }

            document = migrated;
            self.logger
                .info(&format!("Configuration now at version {}", id));
            applied.push(id);
        }

        self.report_skipped(&mut skipped, applied.last());

        Ok(MigrationOutcome {
            document,
            applied,
            skipped,
        })
    }

    /// Marks skips that a later applied migration moved the marker past, and
    /// warns about each skip with what will happen to it.
    fn report_skipped(&self, skipped: &mut [SkippedMigration], last_applied: Option<&MigrationId>) {
        for skip in skipped.iter_mut() {
            skip.superseded = last_applied
                .is_some_and(|last| compare(last, &skip.id) == Ordering::Greater);

            let followup = if skip.superseded {
                "A newer migration was applied after it, so it will not be retried automatically"
            } else {
                "It will be retried on the next run"
            };
            self.logger.warn(&format!(
                "Skipped optional migration {} ({}): {}. {}.",
                skip.id, skip.description, skip.reason, followup
            ));
        }
    }
}

impl std::fmt::Debug for MigrationExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationExecutor").finish_non_exhaustive()
    }
}
