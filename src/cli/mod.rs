//! CLI module for Sophia
//!
//! Provides command-line parsing for the `sophia` binary. Uses clap for
//! argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sophia - book recommendations grounded in your own catalog
///
/// Ingest spreadsheet catalogs into a vector index and ask for three
/// books on any philosophical question.
#[derive(Parser, Debug)]
#[command(
    name = "sophia",
    version,
    about = "Sophia - retrieval-augmented book recommendations",
    long_about = "Ingest spreadsheet book catalogs into a vector index and answer questions\n\
                  with exactly three recommendations grounded in the catalog.\n\n\
                  Run without arguments to start the HTTP server.",
    after_help = "EXAMPLES:\n    \
                  sophia                                  # Start the server (reads sophia.toml)\n    \
                  sophia ingest catalog.xlsx              # Index a spreadsheet\n    \
                  sophia query \"philosophy of mind\"       # Ask for three books\n    \
                  sophia delete-all --yes                 # Clear the namespace\n    \
                  sophia --config my.toml config --validate"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "sophia.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Override the configured host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Load a spreadsheet or CSV/TSV file into the vector index
    Ingest {
        /// File to ingest (.xlsx, .xls, .ods, .csv, .tsv)
        file: PathBuf,
    },

    /// Ask for three book recommendations
    ///
    /// Tokens are printed as the model produces them.
    Query {
        /// The question, keyword or proposition
        question: String,

        /// Print the final result as JSON instead of a formatted list
        #[arg(long)]
        json: bool,
    },

    /// Delete every record in the configured namespace
    DeleteAll {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file and required environment
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
