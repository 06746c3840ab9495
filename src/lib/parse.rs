use std::{collections::BTreeMap, fmt};

use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

/// First line of every file written by [`serialize`].
pub const HEADER: &str = "# this file was created automatically by heroku-config";

const COMMENT_PREFIX: &str = "#";
const ASSIGNMENT_OPERATOR: &str = "=";
const QUOTE: char = '"';
const ESCAPED_NEWLINE: &str = "\\n";

static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(export\s)?\s?([A-Za-z_][A-Za-z0-9_]*)\s?=\s?(.*)$").expect("valid regex")
});

static EXPANDED_LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(export\s)?\s?([A-Za-z_][A-Za-z0-9_.\-]*)\s?=\s?(.*)$").expect("valid regex")
});

/// Config vars keyed by name. Iteration order is the on-disk order.
pub type ConfigMap = BTreeMap<String, String>;

/// Flags controlling [`parse`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
  /// Also accept `.` and `-` in variable names.
  pub expanded: bool,
  /// Do not collect warnings.
  pub quiet: bool,
}

/// Non-fatal problems found while parsing. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseWarning {
  #[error("{key} is in env file twice (line {line})")]
  DuplicateKey { line: usize, key: String },
  #[error("unable to parse line {line}: {content}")]
  UnparsableLine { line: usize, content: String },
  #[error("value of {key} opened on line {line} is never closed, skipping it")]
  UnterminatedValue { line: usize, key: String },
}

/// Result of [`parse`]: the best-effort map plus whatever went wrong on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
  pub vars: ConfigMap,
  pub warnings: Vec<ParseWarning>,
}

impl Parsed {
  fn warn(&mut self, options: ParseOptions, warning: ParseWarning) {
    #[cfg(feature = "tracing")]
    trace!("Parse warning (quiet: {}): {}", options.quiet, warning);

    if !options.quiet {
      self.warnings.push(warning);
    }
  }
}

/// Borrowed view of a [`ConfigMap`] that renders the file format.
pub struct Document<'a>(pub &'a ConfigMap);

impl fmt::Display for Document<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", HEADER)?;
    writeln!(f)?;
    for (key, value) in self.0 {
      writeln!(
        f,
        "{}{}{}{}{}",
        key,
        ASSIGNMENT_OPERATOR,
        QUOTE,
        value.replace('\n', ESCAPED_NEWLINE),
        QUOTE
      )?;
    }
    Ok(())
  }
}

/// Renders `vars` in the on-disk format.
///
/// Keys come out sorted, so equal maps always produce identical bytes. Embedded
/// newlines are written as a literal `\n`; double quotes are not escaped.
pub fn serialize(vars: &ConfigMap) -> String {
  Document(vars).to_string()
}

/// A quoted value that spans several physical lines.
struct OpenValue<'a> {
  key: &'a str,
  line: usize,
  lines: Vec<&'a str>,
}

impl OpenValue<'_> {
  fn close(self) -> String {
    strip_quotes(&self.lines.join("\n")).to_string()
  }
}

/// Parses an env file.
///
/// Never fails: malformed lines and duplicate keys become [`ParseWarning`]s and
/// parsing carries on with the next line.
pub fn parse(s: &str, options: ParseOptions) -> Parsed {
  let separator = if s.contains("\r\n") { "\r\n" } else { "\n" };
  let pattern: &Regex = if options.expanded {
    &*EXPANDED_LINE_PATTERN
  } else {
    &*LINE_PATTERN
  };

  #[cfg(feature = "tracing")]
  debug!(
    "Parsing env file split on {:?} (expanded keys: {})",
    separator, options.expanded
  );

  let mut parsed = Parsed::default();
  let mut open: Option<OpenValue> = None;

  for (index, line) in s.split(separator).enumerate() {
    let number = index + 1;

    #[cfg(feature = "tracing")]
    trace!("Parsing line {}: {:?}", number, line);

    if let Some(mut value) = open.take() {
      value.lines.push(line);
      if line.ends_with(QUOTE) {
        #[cfg(feature = "tracing")]
        trace!("Closed multi-line value for {}", value.key);

        parsed.vars.insert(value.key.to_string(), value.close());
      } else {
        open = Some(value);
      }
      continue;
    }

    if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
      continue;
    }

    let Some((key, value)) = split_assignment(pattern, line) else {
      parsed.warn(
        options,
        ParseWarning::UnparsableLine {
          line: number,
          content: line.to_string(),
        },
      );
      continue;
    };

    if value.starts_with(QUOTE) && !value.ends_with(QUOTE) {
      #[cfg(feature = "tracing")]
      trace!("Opened multi-line value for {}", key);

      open = Some(OpenValue {
        key,
        line: number,
        lines: vec![value],
      });
      continue;
    }

    if parsed.vars.contains_key(key) {
      parsed.warn(
        options,
        ParseWarning::DuplicateKey {
          line: number,
          key: key.to_string(),
        },
      );
    }
    parsed
      .vars
      .insert(key.to_string(), strip_quotes(value).to_string());
  }

  if let Some(value) = open {
    parsed.warn(
      options,
      ParseWarning::UnterminatedValue {
        line: value.line,
        key: value.key.to_string(),
      },
    );
  }

  #[cfg(feature = "tracing")]
  debug!(
    vars = parsed.vars.len(),
    warnings = parsed.warnings.len(),
    "Parsed env file"
  );

  parsed
}

fn split_assignment<'a>(pattern: &Regex, line: &'a str) -> Option<(&'a str, &'a str)> {
  let captures = pattern.captures(line)?;
  Some((captures.get(2)?.as_str(), captures.get(3)?.as_str()))
}

/// Drops at most one quote from each end.
fn strip_quotes(value: &str) -> &str {
  let value = value.strip_prefix(QUOTE).unwrap_or(value);
  value.strip_suffix(QUOTE).unwrap_or(value)
}
