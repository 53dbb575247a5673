use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clipjoin")]
#[command(author, version, about = "Join split camera recordings back into whole files")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find fragment groups in the source directory and join each of them
    Run {
        /// Directory holding the camera footage
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Directory for joined recordings
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Copy footage here before joining
        #[arg(long)]
        staging: Option<PathBuf>,

        /// Join straight from the source directory, even if staging is configured
        #[arg(long)]
        no_copy: bool,

        /// Keep staged fragments after a successful join
        #[arg(long)]
        keep_fragments: bool,

        /// Show the groups that would be joined without copying or joining
        #[arg(long)]
        dry_run: bool,
    },

    /// Join explicit files, in the given order, into one recording
    Join {
        /// Output name; a trailing container extension is ignored
        #[arg(required = true)]
        name: String,

        /// Fragments to join, in order
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Directory for the joined file (defaults to the configured output directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Show how a directory would be grouped
    Plan {
        /// Directory to inspect (defaults to the configured source directory)
        dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
