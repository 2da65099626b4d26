// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! shmring CLI
//!
//! Command-line interface for creating, inspecting and driving shared
//! memory ring channels.

use clap::{Parser, Subcommand};

mod commands;
mod error;
mod session;
mod tui;

/// shmring - named shared memory rings with robust cross-process locking
#[derive(Parser)]
#[command(name = "shmring")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (used when present)
    #[arg(short, long, default_value = "shmring.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a ring, or attach to it if it already exists
    Create {
        /// Channel name
        name: String,

        /// Total size in bytes, header included (defaults to the config entry)
        #[arg(short, long)]
        size: Option<usize>,

        /// Fail if the ring already exists
        #[arg(long)]
        exclusive: bool,
    },

    /// Write bytes into a ring (from the argument, or stdin when omitted)
    Write {
        /// Channel name
        name: String,

        /// Payload; read from stdin when omitted
        data: Option<String>,

        /// Treat the payload as hex
        #[arg(long)]
        hex: bool,

        /// Clear the ring if its lock was abandoned by a dead holder
        #[arg(long)]
        reset_abandoned: bool,
    },

    /// Read and consume pending bytes
    Read {
        /// Channel name
        name: String,

        /// Maximum bytes to read
        #[arg(short, long, default_value_t = 4096)]
        max: usize,

        /// Print as hex instead of raw bytes
        #[arg(long)]
        hex: bool,

        /// Clear the ring if its lock was abandoned by a dead holder
        #[arg(long)]
        reset_abandoned: bool,
    },

    /// Show pending bytes without consuming them
    Peek {
        /// Channel name
        name: String,

        /// Maximum bytes to show
        #[arg(short, long, default_value_t = 256)]
        max: usize,
    },

    /// Show fill level and lock state
    Stat {
        /// Channel name
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reset a ring to empty
    Clear {
        /// Channel name
        name: String,
    },

    /// Unlink a ring's shared memory objects
    Remove {
        /// Channel name
        name: String,
    },

    /// List configured channels
    List,

    /// Live dashboard of configured channels
    Monitor,

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let session = session::Session::load(&cli.config)?;

    // Dispatch to command handlers
    match cli.command {
        Commands::Create {
            name,
            size,
            exclusive,
        } => commands::create::execute(&session, &name, size, exclusive).await,
        Commands::Write {
            name,
            data,
            hex,
            reset_abandoned,
        } => commands::write::execute(&session, &name, data, hex, reset_abandoned).await,
        Commands::Read {
            name,
            max,
            hex,
            reset_abandoned,
        } => commands::read::execute(&session, &name, max, hex, reset_abandoned).await,
        Commands::Peek { name, max } => commands::peek::execute(&session, &name, max).await,
        Commands::Stat { name, json } => commands::stat::execute(&session, &name, json).await,
        Commands::Clear { name } => commands::clear::execute(&session, &name).await,
        Commands::Remove { name } => commands::remove::execute(&name).await,
        Commands::List => commands::list::execute(&session).await,
        Commands::Monitor => tui::run_dashboard(&session).await,
        Commands::Validate { file } => commands::validate::execute(&file).await,
    }
}
