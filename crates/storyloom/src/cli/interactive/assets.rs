//! Guided asset management: show what is on disk and offer the download.

use crate::cli::assets::{check_installed, download, print_status};
use console::Style;
use dialoguer::Select;
use storyloom_core::Config;

use super::theme::storyloom_theme;

enum AssetAction {
    Download,
    ShowPath,
    Back,
}

/// Show installed asset status and offer download options.
pub async fn guided_assets(config: &Config) -> anyhow::Result<()> {
    let theme = storyloom_theme();

    loop {
        let status = check_installed(config);
        eprintln!();
        for asset in &status {
            print_status(asset);
        }
        eprintln!();

        let mut items: Vec<&str> = Vec::new();
        let mut actions: Vec<AssetAction> = Vec::new();

        if status.iter().any(|s| !s.is_present()) {
            items.push("Download speech model and voices");
            actions.push(AssetAction::Download);
        } else {
            items.push("Verify checksums");
            actions.push(AssetAction::Download);
        }
        items.push("Show asset directory");
        actions.push(AssetAction::ShowPath);
        items.push("Back");
        actions.push(AssetAction::Back);

        let selection = Select::with_theme(&theme)
            .with_prompt("Speech assets")
            .items(&items)
            .default(0)
            .interact_opt()?;

        match selection.map(|idx| &actions[idx]) {
            Some(AssetAction::Download) => match download(config).await {
                Ok(_) => {
                    let done = Style::new().for_stderr().green();
                    eprintln!("{}", done.apply_to("  Assets ready."));
                }
                Err(e) => {
                    let err = Style::new().for_stderr().red();
                    eprintln!("  {} {e}", err.apply_to("✗"));
                }
            },
            Some(AssetAction::ShowPath) => {
                eprintln!();
                eprintln!("  {}", config.asset_dir().display());
            }
            Some(AssetAction::Back) | None => break,
        }
    }

    Ok(())
}
