use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    if let Some(tag) = option_env!("GET_BLENDER_GIT_TAG") {
        return tag;
    }

    let commit = option_env!("GET_BLENDER_GIT_COMMIT").unwrap_or("unknown");
    let branch = option_env!("GET_BLENDER_GIT_BRANCH").unwrap_or("unknown");

    // Computed once at startup
    let version = format!("v{}-{} ({})", BASE_VERSION, commit, branch);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "get-blender")]
#[command(about = "Fetch, cache and prepare Blender releases for add-on testing")]
#[command(version = get_version(), propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Shorthand for `get-blender install <VERSION>`
    #[command(flatten)]
    pub install: InstallArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct InstallArgs {
    /// Blender version, e.g. '2.79b', '2.83' or '2.90-nightly'
    pub blender_version: Option<String>,

    /// Extra requirements file to install into Blender's python (repeatable)
    #[arg(short = 'r', long = "requirements")]
    pub requirements: Vec<PathBuf>,

    /// Fail when installing pip or the requirements fails
    #[arg(long)]
    pub strict_bootstrap: bool,

    /// Print the installed release as JSON instead of its path
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download (if needed) and prepare a Blender release
    #[command(
        after_help = "Examples:\n  get-blender install 2.79b\n  get-blender install 2.83 -r requirements.txt\n  BLENDER_CACHE=~/.cache/blender get-blender install 2.90-nightly"
    )]
    Install(InstallArgs),

    /// Show which download a version resolves to, without fetching it
    Resolve {
        /// Blender version, e.g. '2.79b'
        blender_version: Option<String>,
    },

    /// Inspect get-blender's configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show the current version
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective settings (defaults, settings file and environment)
    Show {
        /// Output format (json, yaml)
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Print the settings file location
    Path,
}
