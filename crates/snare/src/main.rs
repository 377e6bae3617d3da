// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snare - scam-engagement honeypot intelligence core.
//!
//! This is the binary entry point. It exposes the extraction pipeline, the
//! URL risk aggregator, and the streaming transcriber as one-shot commands.

mod extract;
mod scan;
mod telemetry;
mod transcribe;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use snare_config::SnareConfig;

/// Snare - scam-engagement honeypot intelligence core.
#[derive(Parser, Debug)]
#[command(name = "snare", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract intelligence from a piece of text and print it as JSON.
    Extract {
        /// Text to analyze. Reads stdin when omitted.
        text: Option<String>,
    },
    /// Score one or more URLs with the configured scanners.
    Scan {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Stream WAV files through the transcription buffer.
    Transcribe {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Validate and print the effective configuration.
    Config,
}

fn load_config(path: Option<&PathBuf>) -> SnareConfig {
    let loaded = match path {
        Some(path) => snare_config::load_and_validate_path(path),
        None => snare_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            snare_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    telemetry::init_tracing(&config.agent.log_level);
    telemetry::register_metrics();

    let result = match cli.command {
        Some(Commands::Extract { text }) => extract::run_extract(text).await,
        Some(Commands::Scan { urls }) => scan::run_scan(&config, &urls).await,
        Some(Commands::Transcribe { files }) => {
            transcribe::run_transcribe(&config, &files).await
        }
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("snare: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("snare: {e}");
        std::process::exit(1);
    }
}

fn print_config(config: &SnareConfig) -> Result<(), snare_core::SnareError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| snare_core::SnareError::Config(format!("cannot render config: {e}")))?;
    println!("{rendered}");
    Ok(())
}
