use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "codevet")]
#[command(about = "Layered Python code validation with cost-aware model review", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Cache directory (overrides the config file)
    #[arg(long, global = true, env = "CODEVET_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Configuration file (defaults to the nearest .codevet.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a Python file or every Python file in a directory
    Check {
        /// File or directory to validate
        path: PathBuf,

        /// Validate only this function (file paths only)
        #[arg(short, long)]
        function: Option<String>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Print machine-readable JSON instead of text
        #[arg(long)]
        json: bool,

        /// Never call a paid model; use free layers only
        #[arg(long)]
        no_models: bool,
    },

    /// Inspect or maintain the verdict cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Show entry, hit and pattern counts
    Stats,
    /// Apply the retention policy
    Prune,
    /// Delete every cached verdict, embedding and pattern record
    Clear,
}
