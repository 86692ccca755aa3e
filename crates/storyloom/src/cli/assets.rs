//! The `storyloom assets` command for the local speech model files.

use clap::{Args, Subcommand};
use console::Style;
use storyloom_core::speech::{AssetStatus, LocalAssets};
use storyloom_core::Config;

/// Arguments for the `assets` command.
#[derive(Args, Debug)]
pub struct AssetsArgs {
    #[command(subcommand)]
    pub command: AssetsCommand,
}

/// Subcommands for asset management.
#[derive(Subcommand, Debug)]
pub enum AssetsCommand {
    /// Download and verify the local speech model and voice table
    Download,

    /// List asset files and their pinned checksums
    List,

    /// Show asset directory path
    Path,
}

/// Execute the assets command.
pub async fn execute(args: AssetsArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        AssetsCommand::Download => {
            let paths = download(config).await?;
            println!("{}", paths.weights.display());
            println!("{}", paths.voices.display());
        }

        AssetsCommand::List => {
            for status in check_installed(config) {
                print_status(&status);
            }
        }

        AssetsCommand::Path => {
            println!("{}", config.asset_dir().display());
        }
    }

    Ok(())
}

/// The asset pair described by the `[speech.local]` section.
pub fn local_assets(config: &Config) -> LocalAssets {
    let local = config.speech.local.clone().unwrap_or_default();
    LocalAssets::from_config(config.asset_dir(), &local)
}

/// On-disk state of both assets.
pub fn check_installed(config: &Config) -> Vec<AssetStatus> {
    local_assets(config).status()
}

/// Download whatever is missing and verify both files.
pub async fn download(config: &Config) -> anyhow::Result<storyloom_core::speech::AssetPaths> {
    let assets = local_assets(config);
    tracing::info!("Asset directory: {}", assets.dir().display());
    let paths = assets.ensure().await?.clone();
    Ok(paths)
}

pub fn print_status(status: &AssetStatus) {
    let green = Style::new().for_stderr().green();
    let red = Style::new().for_stderr().red();
    let dim = Style::new().for_stderr().dim();

    match status.size_bytes {
        Some(size) => eprintln!(
            "  {} {:<22} {:>8.1} MB  {}",
            green.apply_to("✓"),
            status.file_name,
            size as f64 / 1_000_000.0,
            dim.apply_to(status.pinned_blake3.as_deref().unwrap_or("unpinned"))
        ),
        None => eprintln!(
            "  {} {:<22} {}",
            red.apply_to("✗"),
            status.file_name,
            dim.apply_to("not downloaded")
        ),
    }
}
