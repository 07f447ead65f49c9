// Key-value persistence backends and the task blob codec

use crate::task::Task;
use eyre::{Context, Result, eyre};
use fs2::FileExt;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key under which the task collection is stored
pub const TASKS_KEY: &str = "tasks";

/// Layout version of a `FileStorage` directory
const CURRENT_VERSION: u32 = 1;

/// A named-blob store, the persistence boundary of the task list
pub trait KeyValueStore {
    /// Read a blob; `Ok(None)` when the key has never been written
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite a blob
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process store, lost when dropped
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blobs: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `value` already stored under `key`
    pub fn with_blob(key: &str, value: impl Into<String>) -> Self {
        let mut storage = Self::default();
        storage.blobs.insert(key.to_string(), value.into());
        storage
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory-backed store: one `<key>.json` file per key
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open or create a store directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        fs::create_dir_all(&base_path).context("Failed to create store directory")?;

        let storage = Self { base_path };
        storage.write_version()?;

        debug!(path = ?storage.base_path, "Opened file storage");
        Ok(storage)
    }

    /// Get the base path of this store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn write_version(&self) -> Result<()> {
        let version_path = self.base_path.join(".version");
        if !version_path.exists() {
            fs::write(version_path, CURRENT_VERSION.to_string())?;
        }
        Ok(())
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf> {
        Self::validate_key(key)?;
        Ok(self.base_path.join(format!("{}.json", key)))
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(eyre!("Key cannot be empty"));
        }
        if key.len() > 64 {
            return Err(eyre!("Key too long: {} (max 64 chars)", key));
        }
        if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
            return Err(eyre!("Invalid key: {} (must be alphanumeric with _/-)", key));
        }
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.blob_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.blob_path(key)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.base_path.join(".lock"))
            .context("Failed to open lock file")?;

        // Acquire exclusive lock before writing
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        // Write to a sibling temp file, then rename over the blob
        let tmp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path).context("Failed to create temp file")?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, &path).with_context(|| format!("Failed to replace {}", path.display()))?;

        // Lock is automatically released when the file is dropped
        Ok(())
    }
}

/// Serialize the collection into the blob format
pub fn encode_tasks(tasks: &[Task]) -> Result<String> {
    serde_json::to_string(tasks).context("Failed to serialize tasks")
}

/// Parse a stored blob
///
/// Returns `None` when the blob is not a JSON array. Elements that are not
/// task-like objects are skipped.
pub fn decode_tasks(blob: &str) -> Option<Vec<Task>> {
    let parsed: Value = match serde_json::from_str(blob) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = ?e, "Stored tasks are not valid JSON, ignoring");
            return None;
        }
    };

    let Value::Array(items) = parsed else {
        warn!("Stored tasks are not an array, ignoring");
        return None;
    };

    let total = items.len();
    let mut tasks = Vec::with_capacity(total);
    for (position, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<Task>(item) {
            Ok(task) => tasks.push(task),
            Err(e) => {
                warn!(position, error = ?e, "Failed to parse stored task, skipping");
            }
        }
    }

    debug!(count = tasks.len(), skipped = total - tasks.len(), "Decoded stored tasks");
    Some(tasks)
}
