//! Persisted operator preferences.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{JogpadError, Result};

/// Preference key holding the test mode flag.
pub const TEST_MODE_KEY: &str = "jogpad.test_mode";

/// Boolean key/value preference storage.
pub trait PreferenceStore: Send {
    /// Reads a flag. `Ok(None)` if it was never stored.
    fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Stores a flag.
    fn set_bool(&mut self, key: &str, value: bool) -> Result<()>;
}

/// Preferences kept as a flat TOML table of booleans.
#[derive(Debug, Clone)]
pub struct TomlPreferenceStore {
    path: PathBuf,
}

impl TomlPreferenceStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn read_table(&self) -> Result<BTreeMap<String, bool>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&contents)?)
    }
}

impl PreferenceStore for TomlPreferenceStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.read_table()?.get(key).copied())
    }

    /// Fails without writing if the existing file cannot be read, so keys
    /// already in it are never lost.
    fn set_bool(&mut self, key: &str, value: bool) -> Result<()> {
        let mut table = self.read_table().map_err(|e| {
            JogpadError::Preferences(format!(
                "Refusing to overwrite unreadable {}: {}",
                self.path.display(),
                e
            ))
        })?;
        table.insert(key.to_string(), value);
        let contents = toml::to_string(&table)
            .map_err(|e| JogpadError::Preferences(format!("Failed to encode preferences: {}", e)))?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

/// Reads the persisted test mode, treating any failure as "off".
pub fn load_test_mode(store: &dyn PreferenceStore) -> bool {
    match store.get_bool(TEST_MODE_KEY) {
        Ok(value) => value.unwrap_or(false),
        Err(e) => {
            warn!("Preferences unavailable ({}), test mode off", e);
            false
        }
    }
}
