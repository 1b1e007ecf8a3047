pub mod migration;
pub mod migration_service;
pub mod paths;
pub mod storage;

pub use crate::migration_service::{ConfigMigrationService, InitOutcome, MigrationStatus};
pub use crate::paths::DevflowPaths;
pub use crate::storage::ConfigStorage;
