//! Configuration migration engine for devflow.
//!
//! Evolves the persisted configuration documents across releases so users
//! never hand-edit them. The engine guarantees that:
//!
//! - Migrations run in strictly increasing identity order, one at a time
//! - The document is saved after every successful migration, so a crash
//!   between steps neither loses nor repeats completed work
//! - A failing prerequisite migration stops the run; a failing optional one is
//!   skipped with a warning and retried on the next run
//! - The GLOBAL and PROJECT documents never share a catalog or a marker
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  ConfigMigrationService                       │
//! │   (loads the document, wires registry + executor + store)     │
//! └──────────────────────────────────────────────────────────────┘
//!          │                                  │
//!          V                                  V
//!   MigrationRegistry                  MigrationExecutor
//!   (discover + pending)               (apply + persist per step)
//!          │
//!          V
//!   CatalogSource ── StaticCatalog (catalog::builtin)
//!          │
//!          V
//!   Migration (id, description, scope, prerequisite, up, down)
//! ```
//!
//! # Adding a Migration
//!
//! 1. Generate an identity with `devflow migrate new`.
//! 2. Implement `Migration` in `catalog/global.rs` or `catalog/project.rs`.
//!    `up` must return the document unchanged when there is nothing to do.
//! 3. Register a `CatalogEntry` for it in `catalog::builtin()`.
//!
//! Mark it as a prerequisite only if commands cannot work on the old layout.

pub mod catalog;
mod executor;
mod id;
mod logger;
mod registry;
mod traits;

// Public API
pub use catalog::{CatalogEntry, CatalogSource, MigrationFactory, StaticCatalog};
pub use executor::{MigrationError, MigrationExecutor, MigrationOutcome, SkippedMigration};
pub use id::{INITIAL_VERSION, MIGRATION_ID_WIDTH, MigrationId, VersionMarker, compare};
pub use logger::{MigrationLogger, TracingLogger};
pub use registry::{DiscoveryError, MigrationRegistry};
pub use traits::{Migration, TransformError};
