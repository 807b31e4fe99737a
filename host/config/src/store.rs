//! Flat key/value store persisted as a property file.
//!
//! Entries are `group.key=value` lines. The composite key joins the group
//! and item key with `.`, so neither may contain the separator.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// Default store file name within the config directory.
const CONFIG_FILE_NAME: &str = "lodestone.properties";

/// Resolve the Lodestone config directory.
/// Priority: `LODESTONE_CONFIG_DIR` env > `~/.lodestone/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LODESTONE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".lodestone");
    }
    PathBuf::from(".lodestone")
}

/// Resolve the full path to the store file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Persisted flat mapping from `(group, key)` to string values.
///
/// Shared by all typed views and the settings UI. Reads are concurrent;
/// writes, `load` and `save` serialize through the inner lock.
pub struct ConfigStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full store from disk, replacing in-memory content.
    ///
    /// A missing file is a first run and yields an empty store.
    pub async fn load(&self) -> Result<(), ConfigError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No config file; starting with an empty store");
                self.write_entries().clear();
                return Ok(());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let mut parsed = BTreeMap::new();
        for (lineno, line) in raw.lines().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((composite, value)) = trimmed.split_once('=') else {
                warn!(line = lineno + 1, "Skipping malformed config line (no '=')");
                continue;
            };
            let composite = composite.trim();
            match composite.split_once('.') {
                Some((group, key)) if !group.is_empty() && !key.is_empty() => {
                    parsed.insert(composite.to_string(), value.to_string());
                }
                _ => {
                    warn!(line = lineno + 1, "Skipping malformed config line (bad key)");
                }
            }
        }

        let count = parsed.len();
        *self.write_entries() = parsed;
        info!(path = %self.path.display(), entries = count, "Loaded configuration store");
        Ok(())
    }

    /// Write the full store to disk atomically (write to temp file, rename).
    ///
    /// Keeps a `.bak` copy of the previous file.
    pub async fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut body = String::from("# Lodestone configuration\n");
        {
            let entries = self.read_entries();
            for (composite, value) in entries.iter() {
                body.push_str(composite);
                body.push('=');
                body.push_str(value);
                body.push('\n');
            }
        }

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak = self.path.with_extension("properties.bak");
            if let Err(e) = fs::copy(&self.path, &bak).await {
                warn!(path = %bak.display(), error = %e, "Failed to create config backup");
            }
        }

        let tmp_path = self.path.with_extension("properties.tmp");
        fs::write(&tmp_path, body.as_bytes()).await?;
        fs::rename(&tmp_path, &self.path).await?;

        info!(path = %self.path.display(), "Saved configuration store");
        Ok(())
    }

    pub fn get(&self, group: &str, key: &str) -> Option<String> {
        let composite = format!("{}.{}", group, key);
        self.read_entries().get(&composite).cloned()
    }

    pub fn set(&self, group: &str, key: &str, value: &str) -> Result<(), ConfigError> {
        let composite = composite_key(group, key)?;
        if value.contains('\n') || value.contains('\r') {
            return Err(ConfigError::InvalidValue(composite));
        }
        debug!(key = %composite, value = %value, "Setting configuration value");
        self.write_entries().insert(composite, value.to_string());
        Ok(())
    }

    pub fn unset(&self, group: &str, key: &str) -> Result<(), ConfigError> {
        let composite = composite_key(group, key)?;
        debug!(key = %composite, "Unsetting configuration value");
        self.write_entries().remove(&composite);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// Snapshot of all `composite key -> value` entries.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.read_entries().clone()
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.entries.read().expect("config store lock poisoned")
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.entries.write().expect("config store lock poisoned")
    }
}

/// Join group and item key into the persisted composite, rejecting keys
/// that would be unparseable.
fn composite_key(group: &str, key: &str) -> Result<String, ConfigError> {
    validate_key_part(group)?;
    validate_key_part(key)?;
    Ok(format!("{}.{}", group, key))
}

fn validate_key_part(part: &str) -> Result<(), ConfigError> {
    if part.is_empty() {
        return Err(ConfigError::InvalidKey {
            key: part.to_string(),
            reason: "must not be empty",
        });
    }
    if part.contains('.') || part.contains('=') {
        return Err(ConfigError::InvalidKey {
            key: part.to_string(),
            reason: "must not contain '.' or '='",
        });
    }
    Ok(())
}
