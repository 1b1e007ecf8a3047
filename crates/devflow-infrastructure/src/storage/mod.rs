//! Storage layer for configuration documents.

mod config_storage;

pub use config_storage::{ConfigStorage, ConfigStorageError};
