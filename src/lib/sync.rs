//! Pulling config vars into a local env file and pushing them back.
//!
//! # Merge Logic
//!
//! Both directions merge a *source* map into a *target* map:
//!
//! | operation | source | target |
//! |-----------|--------|--------|
//! | pull      | remote | local  |
//! | push      | local  | remote |
//!
//! 1. Keys present on only one side are kept as they are
//! 2. For keys present on both sides with different values:
//!    - with `interactive`, the user is asked whether the source value wins
//!    - otherwise the source value wins only with `overwrite`
//! 3. Pull writes the result to the local file; push sends only the keys whose
//!    value differs from the remote
//! 4. Push with `clean` offers to remove remote keys missing from the local file
//!
//! # Examples
//!
//! ```rust,no_run
//! use heroku_config::prompt::StdinPrompter;
//! use heroku_config::remote::HerokuClient;
//! use heroku_config::sync::{ConfigSync, SyncOptions};
//!
//! let client = HerokuClient::new("api-token").unwrap();
//! let options = SyncOptions::new("my-app");
//!
//! ConfigSync::pull(&options, &client, &mut StdinPrompter).unwrap();
//! ```

use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::{debug, info, trace};

use crate::{
  parse::{self, ConfigMap, ParseOptions, ParseWarning, Parsed},
  prefs::{PreferenceStore, PrefsError},
  prompt::{self, PromptError, Prompter},
  remote::{ConfigStore, RemoteError},
};

pub const DEFAULT_LOCAL_FILENAME: &str = ".env";

/// Main synchronization service between an env file and a remote app.
pub struct ConfigSync;

impl ConfigSync {
  /// Copies the remote config into the local file.
  ///
  /// A missing local file is treated as empty and created.
  pub fn pull<S, P>(
    options: &SyncOptions,
    store: &S,
    prompter: &mut P,
  ) -> Result<SyncReport, SyncError>
  where
    S: ConfigStore + ?Sized,
    P: Prompter + ?Sized,
  {
    #[cfg(feature = "tracing")]
    info!(app = %options.app, "Starting pull");

    let local_path = options.local_path();

    #[cfg(feature = "tracing")]
    debug!(?local_path, "Resolved local file");

    let remote = store.fetch(&options.app)?;
    let local = read_local(&local_path, options.parse_options());
    let merged = merge(&remote, &local.vars, options, prompter)?;

    let changed = changed_keys(&local.vars, &merged);
    write_local(&local_path, &merged)?;

    #[cfg(feature = "tracing")]
    info!(changed = changed.len(), "Pull completed successfully");

    Ok(SyncReport {
      path: local_path,
      warnings: local.warnings,
      changed,
      deleted: Vec::new(),
    })
  }

  /// Sends the local file's vars to the remote app.
  ///
  /// With `clean`, every remote var missing locally goes through
  /// [`prompt::ask_about_deletion`] before anything is sent, so an invalid
  /// answer leaves the remote untouched.
  pub fn push<S, P, R>(
    options: &SyncOptions,
    store: &S,
    prompter: &mut P,
    prefs: &mut R,
  ) -> Result<SyncReport, SyncError>
  where
    S: ConfigStore + ?Sized,
    P: Prompter + ?Sized,
    R: PreferenceStore + ?Sized,
  {
    #[cfg(feature = "tracing")]
    info!(app = %options.app, "Starting push");

    let local_path = options.local_path();
    let local = read_local(&local_path, options.parse_options());
    let remote = store.fetch(&options.app)?;
    let merged = merge(&local.vars, &remote, options, prompter)?;

    let mut deleted = Vec::new();
    if options.clean {
      for (key, value) in remote.iter().filter(|(key, _)| !local.vars.contains_key(*key)) {
        if prompt::ask_about_deletion(&options.app, key, value, prompter, prefs)? {
          deleted.push(key.clone());
        }
      }
    }

    let changed = changed_keys(&remote, &merged);
    let updates: ConfigMap = changed
      .iter()
      .filter_map(|key| merged.get_key_value(key))
      .map(|(key, value)| (key.clone(), value.clone()))
      .collect();

    if !updates.is_empty() {
      store.push(&options.app, &updates)?;
    }
    if !deleted.is_empty() {
      store.unset(&options.app, &deleted)?;
    }

    #[cfg(feature = "tracing")]
    info!(
      changed = changed.len(),
      deleted = deleted.len(),
      "Push completed successfully"
    );

    Ok(SyncReport {
      path: local_path,
      warnings: local.warnings,
      changed,
      deleted,
    })
  }
}

/// Reads and parses the env file at `path`.
///
/// A file that is missing or unreadable parses as empty.
pub fn read_local<P: AsRef<Path>>(path: P, options: ParseOptions) -> Parsed {
  match std::fs::read_to_string(path.as_ref()) {
    Ok(content) => parse::parse(&content, options),
    Err(_err) => {
      #[cfg(feature = "tracing")]
      debug!(path = ?path.as_ref(), error = %_err, "Starting from an empty env file");
      Parsed::default()
    }
  }
}

/// Writes `vars` to `path` in the env file format.
pub fn write_local<P: AsRef<Path>>(path: P, vars: &ConfigMap) -> Result<(), SyncError> {
  let path = path.as_ref();

  #[cfg(feature = "tracing")]
  debug!("Writing {} vars to {:?}", vars.len(), path);

  std::fs::write(path, parse::serialize(vars)).map_err(|source| SyncError::Write {
    path: path.to_path_buf(),
    source,
  })
}

/// Merges `source` into `target` following the rules in the module docs.
fn merge<P>(
  source: &ConfigMap,
  target: &ConfigMap,
  options: &SyncOptions,
  prompter: &mut P,
) -> Result<ConfigMap, PromptError>
where
  P: Prompter + ?Sized,
{
  let mut merged = target.clone();

  for (key, incoming) in source {
    let replace = match target.get(key) {
      None => true,
      Some(current) if current == incoming => false,
      Some(current) if options.interactive => {
        prompt::ask_about_overwrite(key, current, incoming, prompter)?
      }
      Some(_) => options.overwrite,
    };

    if replace {
      #[cfg(feature = "tracing")]
      trace!("Taking source value for {}", key);
      merged.insert(key.clone(), incoming.clone());
    }
  }

  Ok(merged)
}

fn changed_keys(before: &ConfigMap, after: &ConfigMap) -> Vec<String> {
  after
    .iter()
    .filter(|(key, value)| before.get(*key) != Some(*value))
    .map(|(key, _)| key.clone())
    .collect()
}

/// Configuration options for a pull or push.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
  /// Name of the remote app.
  pub app: String,
  /// Path to the local env file. If None, defaults to `.env` in current directory.
  pub local_file: Option<PathBuf>,
  /// Let the source side win conflicts.
  pub overwrite: bool,
  /// Ask about each conflict instead of applying `overwrite`.
  pub interactive: bool,
  /// Do not report parse warnings.
  pub quiet: bool,
  /// Accept `.` and `-` in variable names.
  pub expanded: bool,
  /// Push only: offer to delete remote vars that are not in the local file.
  pub clean: bool,
}

impl SyncOptions {
  pub fn new<A: Into<String>>(app: A) -> Self {
    Self {
      app: app.into(),
      ..Default::default()
    }
  }

  /// Resolves the env file path, falling back to `.env` in the current directory.
  pub fn local_path(&self) -> PathBuf {
    self.local_file.clone().unwrap_or_else(|| {
      std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(DEFAULT_LOCAL_FILENAME)
    })
  }

  pub fn parse_options(&self) -> ParseOptions {
    ParseOptions {
      expanded: self.expanded,
      quiet: self.quiet,
    }
  }
}

/// What a pull or push did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
  /// The env file that was read (and written, for pull).
  pub path: PathBuf,
  /// Problems found while parsing the env file.
  pub warnings: Vec<ParseWarning>,
  /// Keys set or updated on the target side.
  pub changed: Vec<String>,
  /// Keys removed from the remote app.
  pub deleted: Vec<String>,
}

/// Errors that can occur while syncing.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
  /// Error talking to the remote app
  #[error(transparent)]
  Remote(#[from] RemoteError),
  /// Error asking the user
  #[error(transparent)]
  Prompt(#[from] PromptError),
  /// Error locating or writing the preferences file
  #[error(transparent)]
  Prefs(#[from] PrefsError),
  /// Error writing the env file
  #[error("Error writing to file {} ({source})", .path.display())]
  Write {
    path: PathBuf,
    source: std::io::Error,
  },
}
