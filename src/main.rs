mod bootstrap;
mod cache;
mod cli;
mod config;
#[cfg(target_os = "macos")]
mod dmg;
mod download;
mod error;
mod extract;
mod install;
mod interpreter;
mod platform;
mod resolve;
#[cfg(test)]
mod tests;
mod types;
mod version;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, ConfigAction, InstallArgs};
use config::{
    absolute_requirements, load_settings, render_settings, Settings, DEFAULT_BLENDER_VERSION,
};
use install::{get_blender, http_client, resolve_release, InstallOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;

    let settings = load_settings()?;

    match cli.command {
        Some(Commands::Version) => {
            println!("get-blender v{}", env!("CARGO_PKG_VERSION"));
        }

        Some(Commands::Install(args)) => run_install(&settings, args).await?,

        None => run_install(&settings, cli.install).await?,

        Some(Commands::Resolve { blender_version }) => {
            let version = blender_version.as_deref().unwrap_or(DEFAULT_BLENDER_VERSION);
            let client = http_client()?;
            let (requested, _, release) = resolve_release(&client, &settings, version).await?;
            println!(
                "{} {} {}",
                requested,
                if release.is_nightly { "nightly" } else { "stable" },
                release.download_url
            );
        }

        Some(Commands::Config { action }) => match action {
            ConfigAction::Show { format } => {
                println!("{}", render_settings(&settings, &format)?);
            }
            ConfigAction::Path => match config::get_config_file_path() {
                Some(path) => println!("{}", path.display()),
                None => anyhow::bail!("Could not determine config directory"),
            },
        },
    }

    Ok(())
}

async fn run_install(settings: &Settings, args: InstallArgs) -> Result<()> {
    let version = args
        .blender_version
        .as_deref()
        .unwrap_or(DEFAULT_BLENDER_VERSION);

    let mut requirements = settings.requirements.clone();
    requirements.extend(args.requirements);
    let cwd = std::env::current_dir()?;
    let options = InstallOptions {
        requirements: absolute_requirements(&requirements, &cwd),
        strict_bootstrap: settings.strict_bootstrap || args.strict_bootstrap,
    };

    let installed = get_blender(settings, version, &options).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&installed)?);
    } else {
        println!("{}", installed.executable_dir.display());
    }
    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else if cli.verbose == 0 {
        "info"
    } else if cli.verbose == 1 {
        "debug"
    } else {
        "trace"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the installation path for calling scripts
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}
