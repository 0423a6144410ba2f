use super::{validate, Keymap};
use crate::error::{check_file_name, StoreError};
use itertools::Itertools;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Keymaps saved as pretty JSON files in one directory.
#[derive(Debug, Clone)]
pub struct KeymapStore {
    dir: PathBuf,
}

impl KeymapStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sorted `.json` file names; a missing directory lists as empty.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        Ok(entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| name.ends_with(".json"))
            .sorted()
            .collect())
    }

    pub fn load(&self, name: &str) -> Result<Keymap, StoreError> {
        check_file_name(name)?;
        let path = self.dir.join(name);
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
        let keymap: Keymap =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::json(&path, e))?;
        Self::ensure_valid(&keymap)?;
        debug!(file = name, keys = keymap.len(), "keymap loaded");
        Ok(keymap)
    }

    pub fn save(&self, name: &str, keymap: &Keymap) -> Result<PathBuf, StoreError> {
        check_file_name(name)?;
        Self::ensure_valid(keymap)?;

        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        let path = self.dir.join(name);
        let data = serde_json::to_vec_pretty(keymap).map_err(|e| StoreError::json(&path, e))?;
        fs::write(&path, data).map_err(|e| StoreError::io(&path, e))?;
        info!(file = name, keys = keymap.len(), "keymap saved");
        Ok(path)
    }

    /// Returns whether a file was removed.
    pub fn delete(&self, name: &str) -> Result<bool, StoreError> {
        check_file_name(name)?;
        let path = self.dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    fn ensure_valid(keymap: &Keymap) -> Result<(), StoreError> {
        let issues = validate(keymap);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Invalid(issues.iter().join("; ")))
        }
    }
}
