//! Configuration repository trait.
//!
//! Defines the read/write surface the migration engine and the CLI use to
//! reach persisted configuration documents.

use crate::config::ConfigDocument;
use crate::error::Result;
use std::path::Path;

/// An abstract store for configuration documents keyed by path.
///
/// Path resolution and the on-disk serialization format belong to the
/// implementation. Callers only rely on `write` followed by `read` returning
/// an equal document.
pub trait ConfigRepository: Send + Sync {
    /// Returns true if a document is stored at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Reads the document stored at `path`.
    ///
    /// A missing or empty file reads as an empty document.
    fn read(&self, path: &Path) -> Result<ConfigDocument>;

    /// Durably writes `document` to `path`, replacing any previous content.
    fn write(&self, path: &Path, document: &ConfigDocument) -> Result<()>;
}
