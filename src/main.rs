use clap::{Args, Parser, Subcommand};
use heroku_config::{
  prefs::{JsonPreferenceStore, MemoryPreferenceStore, PreferenceStore, default_prefs_path},
  prompt::{PromptError, StdinPrompter},
  remote::{DEFAULT_API_URL, HerokuClient},
  sync::{ConfigSync, SyncError, SyncOptions, SyncReport},
};
use std::{path::PathBuf, process::ExitCode};

#[derive(Parser)]
#[command(
  name = "heroku-config",
  about = "Push and pull Heroku config vars to and from a local env file",
  version,
  author
)]
struct Cli {
  #[command(subcommand)]
  command: Command,

  /// Heroku API token
  #[arg(long, env = "HEROKU_API_KEY", hide_env_values = true, global = true)]
  token: Option<String>,

  /// Base URL of the Heroku API
  #[arg(long, env = "HEROKU_API_URL", default_value = DEFAULT_API_URL, global = true)]
  api_url: String,

  /// Path to the file remembering deletion answers
  #[arg(long, env = "HEROKU_CONFIG_PREFS", global = true)]
  prefs_file: Option<PathBuf>,

  /// Do not read or remember deletion answers
  #[arg(long, global = true)]
  no_prefs: bool,

  /// Verbose output (-v for verbose, -vv for very verbose)
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  verbose: u8,
}

#[derive(Subcommand)]
enum Command {
  /// Write the app's config vars into the local env file
  Pull(SyncArgs),
  /// Send the local env file's vars to the app
  Push {
    #[command(flatten)]
    sync: SyncArgs,

    /// Offer to delete config vars that are not in the local file
    #[arg(short, long)]
    clean: bool,
  },
}

#[derive(Args)]
struct SyncArgs {
  /// App to sync with
  #[arg(short, long)]
  app: String,

  /// Path to the local env file (defaults to .env)
  #[arg(short, long)]
  file: Option<PathBuf>,

  /// Overwrite existing vars on the receiving side
  #[arg(short, long)]
  overwrite: bool,

  /// Ask before overwriting each conflicting var
  #[arg(short, long)]
  interactive: bool,

  /// Do not print parse warnings
  #[arg(short, long)]
  quiet: bool,

  /// Allow `.` and `-` in variable names
  #[arg(short, long)]
  expanded: bool,
}

impl SyncArgs {
  fn into_options(self, clean: bool) -> SyncOptions {
    SyncOptions {
      app: self.app,
      local_file: self.file,
      overwrite: self.overwrite,
      interactive: self.interactive,
      quiet: self.quiet,
      expanded: self.expanded,
      clean,
    }
  }
}

fn setup_tracing(verbose: u8) {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  let log_level = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
    ))
    .init();
}

fn run(cli: Cli, token: String) -> Result<(), SyncError> {
  let client = HerokuClient::with_base_url(token, cli.api_url)?;
  let mut prompter = StdinPrompter;

  match cli.command {
    Command::Pull(sync) => {
      let options = sync.into_options(false);
      let report = ConfigSync::pull(&options, &client, &mut prompter)?;
      print_warnings(&report);
      println!("Successfully wrote config to {}!", report.path.display());
    }
    Command::Push { sync, clean } => {
      let options = sync.into_options(clean);
      let mut prefs: Box<dyn PreferenceStore> = if cli.no_prefs {
        Box::new(MemoryPreferenceStore::new())
      } else {
        let path = match cli.prefs_file {
          Some(path) => path,
          None => default_prefs_path()?,
        };
        Box::new(JsonPreferenceStore::open(path))
      };

      let report = ConfigSync::push(&options, &client, &mut prompter, prefs.as_mut())?;
      print_warnings(&report);
      println!(
        "Successfully pushed {} var(s) to {}{}",
        report.changed.len(),
        options.app,
        if report.deleted.is_empty() {
          String::new()
        } else {
          format!(" and removed {}", report.deleted.join(", "))
        }
      );
    }
  }

  Ok(())
}

fn print_warnings(report: &SyncReport) {
  for warning in &report.warnings {
    eprintln!("WARN - {}", warning);
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  setup_tracing(cli.verbose);

  let Some(token) = cli.token.clone() else {
    eprintln!("error: no API token, set HEROKU_API_KEY or pass --token");
    return ExitCode::FAILURE;
  };

  match run(cli, token) {
    Ok(()) => ExitCode::SUCCESS,
    Err(SyncError::Prompt(PromptError::InvalidAnswer { answer, expected })) => {
      eprintln!("error: {:?} is not a valid answer", answer);
      eprintln!("usage: answer with one of {}", expected);
      ExitCode::FAILURE
    }
    Err(err) => {
      eprintln!("error: {}", err);
      ExitCode::FAILURE
    }
  }
}
