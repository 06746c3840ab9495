//! Sync Heroku config vars with a local env file.
//!
//! This library reads and writes `.env` files in a deterministic format and
//! moves their contents to and from an app's remote config.
//!
//! # Features
//!
//! - **Deterministic output**: keys are written sorted, under a fixed header
//! - **Forgiving parsing**: malformed lines and duplicate keys become warnings
//! - **Multi-line values**: quoted values may span several physical lines
//! - **Remembered answers**: deletion prompts can be answered once per app
//! - **Optional tracing**: Detailed logging when the `tracing` feature is enabled
//!
//! # Example
//!
//! ```rust
//! use heroku_config::parse::{parse, serialize, ConfigMap, ParseOptions};
//!
//! let mut vars = ConfigMap::new();
//! vars.insert("DATABASE_URL".to_string(), "postgres://localhost/app".to_string());
//!
//! let written = serialize(&vars);
//! let read = parse(&written, ParseOptions::default());
//!
//! assert_eq!(read.vars, vars);
//! ```

pub mod parse;
pub mod prefs;
pub mod prompt;
pub mod remote;
pub mod sync;
