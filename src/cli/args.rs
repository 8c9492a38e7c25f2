//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// loam - a file-backed content server with live rebuilds
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Port to run the HTTP server on (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Hostname of the HTTP server (overrides config)
    #[arg(short = 'H', long, global = true)]
    pub hostname: Option<String>,

    /// Output directory for static/dump modes
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub out: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the server from a directory
    Run {
        /// Site directory to serve
        #[arg(value_hint = clap::ValueHint::DirPath)]
        directory: PathBuf,
    },

    /// Process the site once and write every artifact to the output directory
    Static {
        /// Site directory with source files
        #[arg(value_hint = clap::ValueHint::DirPath)]
        directory: PathBuf,
    },

    /// Static output plus per-file metadata and a serialized context snapshot
    Dump {
        /// Site directory with source files
        #[arg(value_hint = clap::ValueHint::DirPath)]
        directory: PathBuf,
    },
}

impl Cli {
    /// The site directory of the selected subcommand.
    pub fn directory(&self) -> &PathBuf {
        match &self.command {
            Commands::Run { directory }
            | Commands::Static { directory }
            | Commands::Dump { directory } => directory,
        }
    }

    /// Whether the selected mode writes to an output directory.
    pub fn needs_out_dir(&self) -> bool {
        matches!(self.command, Commands::Static { .. } | Commands::Dump { .. })
    }
}
