//! pianoman CLI
//!
//! A Last.fm scrobbler for pianobar. Configure it as pianobar's `event_command`:
//! pianobar runs it with the event name as the only argument and the event
//! payload on stdin.
//!
//! # Commands
//!
//! - `pianoman <event>` - Handle a pianobar event
//! - `flush` - Scrobble queued tracks now
//! - `inspect` - Show the scrobble queue
//! - `version` - Show version information

mod commands;
mod http;

use clap::{Parser, Subcommand, ValueEnum};
use pianoman_core::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Scrobbles pianobar events to Last.fm.
#[derive(Parser)]
#[command(name = "pianoman")]
#[command(author, version, about, long_about = None)]
#[command(subcommand_negates_reqs = true)]
struct Cli {
    /// Path to the config file [default: ~/.config/pianoman/config.yaml]
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// pianobar event, e.g. songstart or songfinish
    #[arg(value_name = "EVENT", required = true)]
    event: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrobble queued tracks without waiting for the next song
    Flush,

    /// Show the scrobble queue
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// List queued tracks
        #[arg(short, long)]
        tracks: bool,
    },

    /// Show version information
    Version,
}

/// Output format for `inspect`.
#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::Version) = cli.command {
        println!("pianoman v{}", env!("CARGO_PKG_VERSION"));
        println!("pianoman core v{}", pianoman_core::VERSION);
        return Ok(());
    }

    let path = match cli.config {
        Some(path) => path,
        None => Config::default_path().ok_or("cannot locate config: HOME is not set")?,
    };
    let config = Config::load(&path)?;

    // Logs go to stderr, stdout belongs to pianobar
    let level = if cli.verbose {
        "debug"
    } else {
        config.verbosity.as_str()
    };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| format!("invalid verbosity {level:?}: {e}"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(mode) = config.insecure_mode() {
        tracing::warn!(
            path = %path.display(),
            "config file has insecure permissions. Want: 600, got {mode:o}"
        );
    }

    match (cli.command, cli.event) {
        (Some(Commands::Flush), _) => commands::flush::run(&config)?,
        (Some(Commands::Inspect { format, tracks }), _) => {
            commands::inspect::run(&config, matches!(format, Format::Json), tracks)?;
        }
        (Some(Commands::Version), _) => {}
        (None, Some(event)) => commands::handle::run(&config, &event)?,
        (None, None) => return Err("an event name is required".into()),
    }

    Ok(())
}
