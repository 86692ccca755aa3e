//! Dialoguer theme and entry banner for interactive mode.

use console::{style, Style};
use dialoguer::theme::ColorfulTheme;

/// Returns a `ColorfulTheme` configured with Storyloom's look.
///
/// - Prompt prefix: cyan `?`
/// - Active item indicator: cyan `▸`
/// - Success prefix: green `✓`
/// - Error prefix: red `✗`
pub fn storyloom_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("?".to_string()).for_stderr().cyan(),
        prompt_style: Style::new().for_stderr().bold(),
        prompt_suffix: style("›".to_string()).for_stderr().bright().black(),
        active_item_prefix: style("▸".to_string()).for_stderr().cyan(),
        active_item_style: Style::new().for_stderr().cyan(),
        success_prefix: style("✓".to_string()).for_stderr().green(),
        success_suffix: style("·".to_string()).for_stderr().bright().black(),
        error_prefix: style("✗".to_string()).for_stderr().red(),
        error_style: Style::new().for_stderr().red(),
        values_style: Style::new().for_stderr().green(),
        ..ColorfulTheme::default()
    }
}

/// Prints the banner to stderr so stdout stays clean for the story.
pub fn print_banner() {
    let title = "AI Story Generator";
    let version_line = format!("Storyloom v{}", storyloom_core::VERSION);
    let tagline = "Turn your images into narrated stories";

    let inner_width = tagline.len().max(version_line.len()) + 4;

    let top = format!("  ╔{:═<width$}╗", "", width = inner_width);
    let mid0 = format!("  ║{:^width$}║", title, width = inner_width);
    let mid1 = format!("  ║{:^width$}║", version_line, width = inner_width);
    let mid2 = format!("  ║{:^width$}║", tagline, width = inner_width);
    let bot = format!("  ╚{:═<width$}╝", "", width = inner_width);

    let cyan = Style::new().for_stderr().cyan();

    eprintln!();
    for line in [&top, &mid0, &mid1, &mid2, &bot] {
        eprintln!("{}", cyan.apply_to(line));
    }
    eprintln!();
}
