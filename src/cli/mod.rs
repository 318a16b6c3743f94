//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sift",
    version,
    author = "neur0map",
    about = "Relevance-gated retrieval with local-or-web answer routing",
    long_about = "Sift keeps a local embedded knowledge base, scores how well retrieved results \
                  actually match a question, and routes each question either to the local store \
                  or to an external web search before generating the final answer."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/sift/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Configuration profile to apply (e.g., "offline")
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question and print the routed answer
    Ask {
        /// Question to answer
        question: String,

        /// Print the full answer object as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive question loop
    Chat,

    /// Search the knowledge base and print the relevance report
    Search {
        /// Search query text
        query: String,

        /// Number of report entries to keep
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show knowledge base status
    Status {
        /// Show status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan a directory and embed its documents into the knowledge store
    Ingest {
        /// Directory to ingest (defaults to the configured knowledge dir)
        path: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in dot notation (e.g., "llm.enabled")
        key: String,

        /// Value to set
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key in dot notation
        key: String,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
