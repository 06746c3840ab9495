//! Remembered answers to the deletion prompt.
//!
//! A preference is a boolean scoped to a context (the app name): `true` means
//! "always delete remote vars missing locally", `false` means "never". The
//! on-disk form is a flat JSON object:
//!
//! ```json
//! { "my-app": true, "other-app": false }
//! ```
//!
//! Writes are a read-modify-write of the whole file, finished with a rename so
//! readers never see a partial file. Nothing locks the file between processes;
//! two concurrent writers can lose an update.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// File name of the preference store inside the home directory.
pub const PREFS_FILENAME: &str = ".heroku_config_prefs.json";

/// Storage for per-context deletion preferences.
pub trait PreferenceStore {
  /// Returns the stored preference for `context`, if any.
  fn get(&self, context: &str) -> Option<bool>;

  /// Stores `value` for `context`.
  fn set(&mut self, context: &str, value: bool) -> Result<(), PrefsError>;
}

/// Returns `~/.heroku_config_prefs.json`.
pub fn default_prefs_path() -> Result<PathBuf, PrefsError> {
  let dirs = directories::BaseDirs::new().ok_or(PrefsError::NoHomeDir)?;
  Ok(dirs.home_dir().join(PREFS_FILENAME))
}

/// Preference store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonPreferenceStore {
  path: PathBuf,
  prefs: BTreeMap<String, bool>,
}

impl JsonPreferenceStore {
  /// Loads the store at `path`. A missing or corrupt file yields an empty store.
  pub fn open<P: Into<PathBuf>>(path: P) -> Self {
    let path = path.into();
    let prefs = load(&path);
    Self { path, prefs }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn save(&self, prefs: &BTreeMap<String, bool>) -> Result<(), PrefsError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(|source| PrefsError::Write {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    let content = serde_json::to_string_pretty(prefs)?;
    let temp_path = self.path.with_extension("json.tmp");
    std::fs::write(&temp_path, content).map_err(|source| PrefsError::Write {
      path: temp_path.clone(),
      source,
    })?;
    std::fs::rename(&temp_path, &self.path).map_err(|source| PrefsError::Write {
      path: self.path.clone(),
      source,
    })?;

    #[cfg(feature = "tracing")]
    debug!(path = %self.path.display(), entries = prefs.len(), "Saved preferences");

    Ok(())
  }
}

impl PreferenceStore for JsonPreferenceStore {
  fn get(&self, context: &str) -> Option<bool> {
    self.prefs.get(context).copied()
  }

  fn set(&mut self, context: &str, value: bool) -> Result<(), PrefsError> {
    // Re-read so entries written by other runs since `open` are kept.
    let mut prefs = load(&self.path);
    prefs.insert(context.to_string(), value);
    self.save(&prefs)?;
    self.prefs = prefs;
    Ok(())
  }
}

fn load(path: &Path) -> BTreeMap<String, bool> {
  let content = match std::fs::read_to_string(path) {
    Ok(content) => content,
    Err(_err) => {
      #[cfg(feature = "tracing")]
      debug!(path = %path.display(), error = %_err, "No preferences loaded");
      return BTreeMap::new();
    }
  };

  match serde_json::from_str(&content) {
    Ok(prefs) => prefs,
    Err(_err) => {
      #[cfg(feature = "tracing")]
      warn!(path = %path.display(), error = %_err, "Ignoring unreadable preferences file");
      BTreeMap::new()
    }
  }
}

/// Preference store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
  prefs: BTreeMap<String, bool>,
}

impl MemoryPreferenceStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, context: &str, value: bool) -> Self {
    self.prefs.insert(context.to_string(), value);
    self
  }
}

impl PreferenceStore for MemoryPreferenceStore {
  fn get(&self, context: &str) -> Option<bool> {
    self.prefs.get(context).copied()
  }

  fn set(&mut self, context: &str, value: bool) -> Result<(), PrefsError> {
    self.prefs.insert(context.to_string(), value);
    Ok(())
  }
}

/// Errors that can occur while persisting preferences.
#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
  /// The home directory could not be determined
  #[error("Unable to locate the home directory for the preferences file")]
  NoHomeDir,
  /// Error writing the preferences file
  #[error("Error writing preferences to {path}: {source}")]
  Write {
    path: PathBuf,
    source: std::io::Error,
  },
  /// Error encoding the preferences
  #[error("Error encoding preferences: {0}")]
  Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_missing_file_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonPreferenceStore::open(temp_dir.path().join("prefs.json"));

    assert_eq!(store.get("my-app"), None);
  }

  #[test]
  fn test_set_persists_json_object() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("prefs.json");

    let mut store = JsonPreferenceStore::open(&path);
    store.set("my-app", true).unwrap();
    store.set("other-app", false).unwrap();

    let on_disk: BTreeMap<String, bool> =
      serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk.get("my-app"), Some(&true));
    assert_eq!(on_disk.get("other-app"), Some(&false));

    let reopened = JsonPreferenceStore::open(&path);
    assert_eq!(reopened.get("my-app"), Some(true));
    assert_eq!(reopened.get("other-app"), Some(false));
    assert!(!path.with_extension("json.tmp").exists());
  }

  #[test]
  fn test_set_keeps_entries_written_elsewhere() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("prefs.json");

    let mut first = JsonPreferenceStore::open(&path);
    let mut second = JsonPreferenceStore::open(&path);
    first.set("a", true).unwrap();
    second.set("b", false).unwrap();

    let reopened = JsonPreferenceStore::open(&path);
    assert_eq!(reopened.get("a"), Some(true));
    assert_eq!(reopened.get("b"), Some(false));
  }

  #[test]
  fn test_corrupt_file_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("prefs.json");
    std::fs::write(&path, "not json").unwrap();

    let mut store = JsonPreferenceStore::open(&path);
    assert_eq!(store.get("my-app"), None);

    store.set("my-app", true).unwrap();
    assert_eq!(JsonPreferenceStore::open(&path).get("my-app"), Some(true));
  }

  #[test]
  fn test_creates_parent_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("prefs.json");

    let mut store = JsonPreferenceStore::open(&path);
    store.set("my-app", false).unwrap();

    assert!(path.exists());
  }

  #[test]
  fn test_default_path_is_in_home() {
    let path = default_prefs_path().unwrap();
    assert!(path.ends_with(PREFS_FILENAME));
  }

  #[test]
  fn test_memory_store() {
    let mut store = MemoryPreferenceStore::new().with("a", true);
    assert_eq!(store.get("a"), Some(true));
    store.set("a", false).unwrap();
    assert_eq!(store.get("a"), Some(false));
  }
}
