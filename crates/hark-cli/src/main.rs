mod commands;
mod keyboard;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use hark_core::Settings;

#[derive(Parser)]
#[command(
    name = "hark",
    version,
    about = "Background voice-control daemon: latch-key dictation and meeting transcription"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable debug logging (RUST_LOG overrides this)
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon in the foreground (default)
    Run,
    /// Transcribe a saved recording through the long-audio pipeline
    Transcribe {
        /// Audio file to transcribe (WAV or MP3)
        file: PathBuf,
        /// Language hint, e.g. "en" (overrides settings)
        #[arg(long)]
        language: Option<String>,
    },
    /// Print the effective settings
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let settings = Settings::load();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::run(settings),
        Commands::Transcribe { file, language } => {
            commands::transcribe::run(settings, file, language)
        }
        Commands::Config => commands::config::run(settings),
    }
}
