//! Config file storage with atomic writes.
//!
//! Documents are stored as TOML and handed out as `ConfigDocument`
//! (a `serde_json` map) so callers never depend on TOML specifics.

use devflow_core::{ConfigDocument, ConfigRepository, DevflowError};
use serde_json::Value as JsonValue;
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during config storage operations.
#[derive(Error, Debug)]
pub enum ConfigStorageError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error in {}: {source}", path.display())]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Value conversion error: {0}")]
    Conversion(String),

    #[error("Lock error on {}: {message}", path.display())]
    Lock { path: PathBuf, message: String },
}

impl ConfigStorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<ConfigStorageError> for DevflowError {
    fn from(err: ConfigStorageError) -> Self {
        match err {
            ConfigStorageError::Io { .. } => DevflowError::io(err.to_string()),
            ConfigStorageError::TomlParse { .. }
            | ConfigStorageError::TomlSer(_)
            | ConfigStorageError::Conversion(_) => DevflowError::Serialization {
                format: "TOML",
                message: err.to_string(),
            },
            ConfigStorageError::Lock { .. } => DevflowError::Lock(err.to_string()),
        }
    }
}

/// TOML-backed configuration store.
///
/// Responsibilities:
/// - **Atomic write** (tmp file + fsync + rename)
/// - **Format conversion** (TOML ⇄ `ConfigDocument`)
/// - **Locked read-modify-write** for `update`
///
/// Does NOT:
/// - Know about migrations or the `migration_version` key
/// - Resolve paths (see `DevflowPaths`)
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigStorage;

impl ConfigStorage {
    pub fn new() -> Self {
        Self
    }

    /// Loads the file at `path`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(doc))`: Successfully loaded
    /// - `Ok(None)`: File doesn't exist or is empty
    /// - `Err`: Failed to read or parse the file
    pub fn load(&self, path: &Path) -> Result<Option<ConfigDocument>, ConfigStorageError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigStorageError::io(path, e))?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let table: toml::Table =
            toml::from_str(&content).map_err(|source| ConfigStorageError::TomlParse {
                path: path.to_path_buf(),
                source,
            })?;

        let json = serde_json::to_value(table)
            .map_err(|e| ConfigStorageError::Conversion(e.to_string()))?;
        let document = ConfigDocument::from_value(json)
            .map_err(|e| ConfigStorageError::Conversion(e.to_string()))?;

        Ok(Some(document))
    }

    /// Saves `document` to `path` atomically.
    ///
    /// The parent directory is created if needed. Readers see either the old
    /// or the new file, never a partial one.
    pub fn save(&self, path: &Path, document: &ConfigDocument) -> Result<(), ConfigStorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| ConfigStorageError::io(parent, e))?;
            }
        }

        let table = json_to_toml(document.as_map())?;
        let toml_string = toml::to_string_pretty(&table)?;

        let tmp_path = temp_path(path)?;
        let mut tmp_file = File::create(&tmp_path).map_err(|e| ConfigStorageError::io(&tmp_path, e))?;
        tmp_file
            .write_all(toml_string.as_bytes())
            .map_err(|e| ConfigStorageError::io(&tmp_path, e))?;
        tmp_file
            .sync_all()
            .map_err(|e| ConfigStorageError::io(&tmp_path, e))?;
        drop(tmp_file);

        fs::rename(&tmp_path, path).map_err(|e| ConfigStorageError::io(path, e))?;

        tracing::debug!("[ConfigStorage] Saved {}", path.display());
        Ok(())
    }

    /// Performs a read-modify-write under an exclusive file lock.
    ///
    /// A missing file starts from an empty document. Changes are written only
    /// if `f` returns `Ok`.
    pub fn update<F>(&self, path: &Path, f: F) -> Result<ConfigDocument, DevflowError>
    where
        F: FnOnce(&mut ConfigDocument) -> Result<(), DevflowError>,
    {
        let _lock = FileLock::acquire(path)?;

        let mut document = self.load(path)?.unwrap_or_default();
        f(&mut document)?;
        self.save(path, &document)?;

        Ok(document)
    }
}

impl ConfigRepository for ConfigStorage {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> devflow_core::error::Result<ConfigDocument> {
        Ok(self.load(path)?.unwrap_or_default())
    }

    fn write(&self, path: &Path, document: &ConfigDocument) -> devflow_core::error::Result<()> {
        Ok(self.save(path, document)?)
    }
}

/// Gets a temporary file path for atomic writes, next to the target.
fn temp_path(path: &Path) -> Result<PathBuf, ConfigStorageError> {
    let file_name = path.file_name().ok_or_else(|| {
        ConfigStorageError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "Path has no file name"),
        )
    })?;

    let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
    Ok(path.with_file_name(tmp_name))
}

fn json_to_toml(map: &serde_json::Map<String, JsonValue>) -> Result<toml::Table, ConfigStorageError> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), json_value_to_toml(key, value)?)))
        .collect()
}

fn json_value_to_toml(key: &str, value: &JsonValue) -> Result<toml::Value, ConfigStorageError> {
    Ok(match value {
        JsonValue::Null => {
            return Err(ConfigStorageError::Conversion(format!(
                "'{}' is null, which TOML cannot represent",
                key
            )));
        }
        JsonValue::Bool(b) => toml::Value::Boolean(*b),
        // Large u64 values would silently become lossy floats
        JsonValue::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => toml::Value::Integer(i),
            (None, Some(f)) if n.is_f64() => toml::Value::Float(f),
            _ => {
                return Err(ConfigStorageError::Conversion(format!(
                    "'{}' = {} does not fit in a TOML integer",
                    key, n
                )));
            }
        },
        JsonValue::String(s) => toml::Value::String(s.clone()),
        JsonValue::Array(items) => toml::Value::Array(
            items
                .iter()
                .map(|item| json_value_to_toml(key, item))
                .collect::<Result<_, _>>()?,
        ),
        JsonValue::Object(map) => toml::Value::Table(json_to_toml(map)?),
    })
}

/// A file lock guard that releases the lock when dropped.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, ConfigStorageError> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| ConfigStorageError::io(parent, e))?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| ConfigStorageError::io(&lock_path, e))?;

        use fs2::FileExt;
        file.lock_exclusive().map_err(|e| ConfigStorageError::Lock {
            path: lock_path.clone(),
            message: format!("Failed to acquire lock: {}", e),
        })?;

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Unlock happens when the handle closes; removing the file is best effort
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(value: JsonValue) -> ConfigDocument {
        ConfigDocument::from_value(value).unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");
        let storage = ConfigStorage::new();

        let data = doc(json!({
            "migration_version": "20240115093000000",
            "language": "en",
            "jira": {"url": "https://jira.example.com", "verify_tls": true},
            "retries": 3
        }));

        storage.save(&file_path, &data).unwrap();
        let loaded = storage.load(&file_path).unwrap().unwrap();

        assert_eq!(loaded, data);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ConfigStorage::new();

        let result = storage.load(&temp_dir.path().join("nonexistent.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_read_empty_file_is_empty_document() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");
        fs::write(&file_path, "  \n").unwrap();

        let storage = ConfigStorage::new();
        assert!(storage.exists(&file_path));
        assert!(storage.read(&file_path).unwrap().is_empty());
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");
        fs::write(&file_path, "language = ").unwrap();

        let err: DevflowError = ConfigStorage::new().read(&file_path).unwrap_err();
        assert!(err.is_serialization());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("devflow").join("config.toml");

        ConfigStorage::new()
            .write(&file_path, &doc(json!({"language": "en"})))
            .unwrap();

        assert!(file_path.exists());
    }

    #[test]
    fn test_update() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");
        let storage = ConfigStorage::new();

        storage
            .update(&file_path, |d| {
                d.set("count", 10);
                Ok(())
            })
            .unwrap();

        let updated = storage
            .update(&file_path, |d| {
                let current = d.get("count").and_then(JsonValue::as_i64).unwrap_or_default();
                d.set("count", current + 5);
                Ok(())
            })
            .unwrap();

        assert_eq!(updated.get("count"), Some(&json!(15)));
        assert_eq!(storage.read(&file_path).unwrap().get("count"), Some(&json!(15)));
        assert!(!file_path.with_extension("lock").exists());
    }

    #[test]
    fn test_update_failure_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");
        let storage = ConfigStorage::new();
        storage.write(&file_path, &doc(json!({"count": 1}))).unwrap();

        let result = storage.update(&file_path, |d| {
            d.set("count", 2);
            Err(DevflowError::config("rejected"))
        });

        assert!(result.is_err());
        assert_eq!(storage.read(&file_path).unwrap().get("count"), Some(&json!(1)));
    }

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");

        ConfigStorage::new()
            .save(&file_path, &doc(json!({"name": "test"})))
            .unwrap();

        // Verify no temp file left behind
        assert!(!temp_dir.path().join(".config.toml.tmp").exists());
        assert!(file_path.exists());
    }

    #[test]
    fn test_integers_beyond_i64_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");
        let storage = ConfigStorage::new();

        let err = storage
            .save(&file_path, &doc(json!({"big": u64::MAX})))
            .unwrap_err();
        assert!(matches!(err, ConfigStorageError::Conversion(ref m) if m.contains("big")));
        assert!(!file_path.exists());

        storage
            .save(&file_path, &doc(json!({"ratio": 0.5, "max": i64::MAX})))
            .unwrap();
        let loaded = storage.read(&file_path).unwrap();
        assert_eq!(loaded.get("ratio"), Some(&json!(0.5)));
        assert_eq!(loaded.get("max"), Some(&json!(i64::MAX)));
    }

    #[test]
    fn test_null_values_cannot_be_stored() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");

        let err = ConfigStorage::new()
            .save(&file_path, &doc(json!({"name": null})))
            .unwrap_err();

        assert!(matches!(err, ConfigStorageError::Conversion(_)));
        assert!(!file_path.exists());
    }
}
