pub use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace), RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download game files and launch using a launch profile
    Launch {
        /// Path to launch profile json file
        profile: PathBuf,

        /// Prepare everything and print the command instead of running it
        #[arg(long)]
        dry_run: bool
    },

    /// Resolve a version descriptor and cache it locally
    Resolve {
        /// Version of minecraft
        version: String,

        /// Launcher root directory, defaults to the data directory
        #[arg(long)]
        root: Option<PathBuf>
    }
}
