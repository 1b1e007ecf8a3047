pub mod config;
pub mod error;
pub mod repository;

// Re-export common types
pub use config::{ConfigDocument, MIGRATION_VERSION_KEY, Scope};
pub use error::{DevflowError, MigrationFailure};
pub use repository::ConfigRepository;
