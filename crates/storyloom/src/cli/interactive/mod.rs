//! Interactive CLI mode: guided experience for bare `storyloom` invocation.
//!
//! When `storyloom` is invoked with no subcommand on a TTY, this module
//! provides a menu-driven interface that delegates to the same generation
//! logic as the flag-based CLI.

pub mod assets;
pub mod setup;
pub mod story;
pub mod theme;

use console::Style;
use dialoguer::Select;
use storyloom_core::Config;

use setup::{config_has_key, KeyedBackend};

/// Convert a dialoguer result into `Ok(Some(value))` on success, `Ok(None)` on
/// interrupt (Ctrl+C / terminal disconnect), and `Err` for other I/O failures.
///
/// Wraps `interact_text()` / `interact()` calls that lack an `_opt` variant.
fn handle_interrupt<T>(result: dialoguer::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Main menu options presented to the user.
const MENU_ITEMS: &[&str] = &[
    "Write a story",
    "Download / manage speech assets",
    "Configure settings",
    "Exit",
];

/// Entry point for interactive mode.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    theme::print_banner();

    let theme = theme::storyloom_theme();

    loop {
        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(MENU_ITEMS)
            .default(0)
            .interact_opt()?;

        match selection {
            Some(0) => story::guided_story(config).await?,
            Some(1) => assets::guided_assets(config).await?,
            Some(2) => show_config(config)?,
            _ => break,
        }
    }

    Ok(())
}

/// Interactive config viewer: a summary of current settings plus the full
/// TOML or the config file path on request.
fn show_config(config: &Config) -> anyhow::Result<()> {
    let theme = theme::storyloom_theme();
    let dim = Style::new().for_stderr().dim();
    let cyan = Style::new().for_stderr().cyan();
    let label = Style::new().for_stderr().bold();

    loop {
        eprintln!();
        eprintln!("  {}", cyan.apply_to("Current configuration:"));
        eprintln!();

        let config_path = Config::default_path();
        let path_note = if config_path.exists() {
            "(exists)"
        } else {
            "(using defaults)"
        };

        eprintln!(
            "    {:<20} {} {}",
            label.apply_to("Config file:"),
            config_path.display(),
            dim.apply_to(path_note)
        );
        eprintln!(
            "    {:<20} {}",
            label.apply_to("Asset dir:"),
            config.asset_dir().display()
        );
        eprintln!(
            "    {:<20} text: {} | speech: {}",
            label.apply_to("Backends:"),
            config.backends.text,
            config.backends.speech
        );
        eprintln!(
            "    {:<20} {} | ~{} words",
            label.apply_to("Story defaults:"),
            config.story.default_genre,
            config.story.default_word_limit
        );
        eprintln!(
            "    {:<20} {} images, {} MB each",
            label.apply_to("Limits:"),
            config.limits.max_images,
            config.limits.max_image_size_mb
        );
        eprintln!(
            "    {:<20} {}",
            label.apply_to("Log level:"),
            config.logging.level
        );
        eprintln!(
            "    {:<20} {}",
            label.apply_to("API keys:"),
            key_summary(config)
        );
        eprintln!();

        let items = &["View full config (TOML)", "Show config file path", "Back"];

        let selection = Select::with_theme(&theme)
            .with_prompt("Configuration")
            .items(items)
            .default(0)
            .interact_opt()?;

        match selection {
            Some(0) => match config.to_toml() {
                Ok(toml) => {
                    eprintln!();
                    eprintln!("{}", dim.apply_to("─".repeat(50)));
                    eprintln!("{toml}");
                    eprintln!("{}", dim.apply_to("─".repeat(50)));
                    eprintln!();
                }
                Err(e) => {
                    let err = Style::new().for_stderr().red();
                    eprintln!("  {} Failed to serialize config: {e}", err.apply_to("✗"));
                    eprintln!();
                }
            },
            Some(1) => {
                eprintln!();
                eprintln!("  {}", Config::default_path().display());
                eprintln!();
            }
            _ => break,
        }
    }

    Ok(())
}

/// Summarise which backends have a key in the environment or config.
fn key_summary(config: &Config) -> String {
    let keyed: Vec<&str> = [
        KeyedBackend::Gemini,
        KeyedBackend::Groq,
        KeyedBackend::Openai,
        KeyedBackend::ElevenLabs,
    ]
    .into_iter()
    .filter(|b| {
        config_has_key(config, *b)
            || std::env::var(setup::env_var_for(*b)).is_ok_and(|v| !v.is_empty())
    })
    .map(setup::backend_label)
    .collect();

    if keyed.is_empty() {
        "none configured".to_string()
    } else {
        keyed.join(", ")
    }
}
