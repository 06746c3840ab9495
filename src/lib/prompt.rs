//! Interactive questions asked while syncing.
//!
//! Input goes through the [`Prompter`] trait so callers can script answers.

use std::{
  io::{self, BufRead, Write},
  str::FromStr,
};

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::prefs::{PreferenceStore, PrefsError};

/// Accepted answers to the deletion question, shown in usage messages.
pub const DELETION_ANSWERS: &str = "d(elete), i(gnore), a(lways), n(ever)";

/// Accepted answers to the overwrite question.
pub const OVERWRITE_ANSWERS: &str = "y(es), n(o)";

/// Source of answers to yes/no style questions.
pub trait Prompter {
  /// Shows `question` and returns the raw answer.
  fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Asks on stderr and reads one line from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
  fn ask(&mut self, question: &str) -> io::Result<String> {
    let mut stderr = io::stderr().lock();
    write!(stderr, "{}", question)?;
    stderr.flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input)
  }
}

/// Answer to the deletion question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionAnswer {
  Delete,
  Ignore,
  Always,
  Never,
}

impl DeletionAnswer {
  /// Whether the var should be deleted this time.
  pub fn delete(self) -> bool {
    matches!(self, Self::Delete | Self::Always)
  }

  /// The preference to remember, if any.
  pub fn remembered(self) -> Option<bool> {
    match self {
      Self::Always => Some(true),
      Self::Never => Some(false),
      Self::Delete | Self::Ignore => None,
    }
  }
}

impl FromStr for DeletionAnswer {
  type Err = PromptError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "d" | "delete" => Ok(Self::Delete),
      "i" | "ignore" => Ok(Self::Ignore),
      "a" | "always" => Ok(Self::Always),
      "n" | "never" => Ok(Self::Never),
      _ => Err(PromptError::InvalidAnswer {
        answer: s.trim().to_string(),
        expected: DELETION_ANSWERS,
      }),
    }
  }
}

/// Asks whether `key` should be removed from the remote app.
///
/// A remembered preference for `context` answers without prompting. "always"
/// and "never" are remembered for next time; "delete" and "ignore" are not.
pub fn ask_about_deletion<P, S>(
  context: &str,
  key: &str,
  value: &str,
  prompter: &mut P,
  prefs: &mut S,
) -> Result<bool, PromptError>
where
  P: Prompter + ?Sized,
  S: PreferenceStore + ?Sized,
{
  if let Some(remembered) = prefs.get(context) {
    #[cfg(feature = "tracing")]
    debug!(context, key, remembered, "Using stored deletion preference");
    return Ok(remembered);
  }

  let question = format!(
    "\"{}\" is set to \"{}\" on {} but is not in the local file. Delete it? [{}] ",
    key, value, context, DELETION_ANSWERS
  );
  let answer: DeletionAnswer = prompter.ask(&question)?.parse()?;

  if let Some(remembered) = answer.remembered() {
    prefs.set(context, remembered)?;
  }

  Ok(answer.delete())
}

/// Asks whether `current` should be replaced by `incoming` for `key`.
///
/// An empty answer means no.
pub fn ask_about_overwrite<P>(
  key: &str,
  current: &str,
  incoming: &str,
  prompter: &mut P,
) -> Result<bool, PromptError>
where
  P: Prompter + ?Sized,
{
  let question = format!(
    "{} is \"{}\", overwrite with \"{}\"? [{}] ",
    key, current, incoming, OVERWRITE_ANSWERS
  );
  let answer = prompter.ask(&question)?;

  match answer.trim().to_ascii_lowercase().as_str() {
    "y" | "yes" => Ok(true),
    "" | "n" | "no" => Ok(false),
    other => Err(PromptError::InvalidAnswer {
      answer: other.to_string(),
      expected: OVERWRITE_ANSWERS,
    }),
  }
}

/// Errors that can occur while prompting.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
  /// Error reading the answer
  #[error("Unable to read answer: {0}")]
  Io(#[from] io::Error),
  /// The answer is not one of the accepted ones
  #[error("Invalid answer {answer:?}, expected one of {expected}")]
  InvalidAnswer {
    answer: String,
    expected: &'static str,
  },
  /// Error remembering the answer
  #[error(transparent)]
  Prefs(#[from] PrefsError),
}
