//! Command-line interface for `schoolfix`.
//!
//! This module provides the CLI parsing and command routing using clap.

pub mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::config::{CliOverrides, Config};
use crate::logging;

/// `schoolfix` - school facility issue reporting.
#[derive(Parser, Debug)]
#[command(name = "schoolfix")]
#[command(
    author,
    version,
    about = "School facility issue reporting (JSON API + CLI)",
    long_about = None,
    after_help = "Configuration: schoolfix.yaml, then SCHOOLFIX_* environment variables, then flags."
)]
pub struct Cli {
    /// Output format: text (default) or json
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Config file (default: ./schoolfix.yaml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// JSON data file used by the file backend
    #[arg(long, global = true, value_name = "PATH")]
    pub data_file: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),

    /// List issues from the data file
    List(ListArgs),

    /// Stats summary (alias: status)
    #[command(alias = "status")]
    Stats,

    /// Validate every record in the data file
    Check,

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Show version information
    Version,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to listen on (host:port)
    #[arg(long)]
    pub listen: Option<String>,

    /// Store backend: file, local or realtime
    #[arg(long)]
    pub backend: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Filter by status (pending, inprogress, resolved)
    #[arg(long)]
    pub status: Option<String>,

    /// Filter by category (label or slug, e.g. network)
    #[arg(long)]
    pub category: Option<String>,

    /// Filter by priority (high, medium, low)
    #[arg(long, short = 'p')]
    pub priority: Option<String>,

    /// Case-insensitive text search over title, description, id and reporter
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Sort order: newest, oldest or priority
    #[arg(long)]
    pub sort: Option<String>,

    /// Maximum number of issues to show
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

impl Cli {
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        let (listen, backend) = match self.command {
            Commands::Serve(ref args) => (args.listen.clone(), args.backend.clone()),
            _ => (None, None),
        };
        CliOverrides {
            listen,
            backend,
            data_file: self.data_file.clone(),
            log_json: self.log_json.then_some(true),
        }
    }
}

/// Run the CLI.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the command fails.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Completions(ref args) => return commands::completions::execute(args),
        Commands::Version => return commands::version::execute(cli.json),
        _ => {}
    }

    let config = Config::load(cli.config.as_deref(), &cli.overrides())?;
    logging::init_logging(cli.verbose, cli.quiet, config.log_json)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    match cli.command {
        Commands::Serve(_) => commands::serve::execute(&config),
        Commands::List(ref args) => commands::list::execute(args, &config, cli.json),
        Commands::Stats => commands::stats::execute(&config, cli.json),
        Commands::Check => commands::check::execute(&config, cli.json),
        Commands::Completions(_) | Commands::Version => Ok(()),
    }
}
