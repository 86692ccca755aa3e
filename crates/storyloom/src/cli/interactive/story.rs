//! Guided story flow.
//!
//! Walks the user through: images → context → genre → length → backends →
//! output folder → confirmation → generation. Builds a `GenerateArgs` and
//! delegates to `cli::generate::execute()`.

use crate::cli::generate::GenerateArgs;
use console::Style;
use dialoguer::{Confirm, Input, Select};
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use storyloom_core::intake::has_allowed_extension;
use storyloom_core::{Config, Genre, WordLimit};

use super::theme::storyloom_theme;

/// Example context shown as a hint above the context prompt.
const CONTEXT_HINTS: &[&str] = &[
    "Turn the uploaded images into a compelling story...",
    "Imagine what happened before and after the moment shown in the images...",
    "Write a story that brings the uploaded images to life...",
    "Tell a story related to the uploaded images, inspired by real-world events...",
];

/// Walk the user through writing one story.
pub async fn guided_story(config: &Config) -> anyhow::Result<()> {
    let theme = storyloom_theme();
    let dim = Style::new().for_stderr().dim();
    let warn = Style::new().for_stderr().yellow();

    // ── Step 1: Images ──────────────────────────────────────────────────────

    let Some(images) = prompt_images(config)? else {
        return Ok(());
    };

    // ── Step 2: Context ─────────────────────────────────────────────────────

    eprintln!();
    eprintln!("  Enter some context for your story below! (Optional)");
    if let Some(hint) = CONTEXT_HINTS.choose(&mut rand::thread_rng()) {
        eprintln!("  {}", dim.apply_to(hint));
    }
    eprintln!(
        "  {}",
        warn.apply_to(
            "Note: Please only provide relevant context for a story. \
             If the text is irrelevant, it will be ignored."
        )
    );

    let Some(context) = super::handle_interrupt(
        Input::<String>::with_theme(&theme)
            .with_prompt("Context")
            .allow_empty(true)
            .interact_text(),
    )?
    else {
        return Ok(());
    };
    let context = Some(context).filter(|c| !c.trim().is_empty());

    // ── Step 3: Genre ───────────────────────────────────────────────────────

    let Some(genre) = select_genre(config, &theme)? else {
        return Ok(());
    };

    // ── Step 4: Word limit ──────────────────────────────────────────────────

    let limits: Vec<WordLimit> = WordLimit::all().collect();
    let limit_items: Vec<String> = limits.iter().map(|w| format!("{w} words")).collect();
    let default_limit = limits
        .iter()
        .position(|w| w.get() == config.story.default_word_limit)
        .unwrap_or(1);
    let Some(limit_idx) = Select::with_theme(&theme)
        .with_prompt("Story length")
        .items(&limit_items)
        .default(default_limit)
        .interact_opt()?
    else {
        return Ok(());
    };
    let words = limits[limit_idx];

    // ── Step 5: Backends ────────────────────────────────────────────────────

    let Some(choice) = super::setup::select_backends(config).await? else {
        return Ok(());
    };

    // ── Step 6: Output folder ───────────────────────────────────────────────

    let Some(output_dir) = super::handle_interrupt(
        Input::<String>::with_theme(&theme)
            .with_prompt("Save story and narration to")
            .default("./storyloom-output".to_string())
            .interact_text(),
    )?
    else {
        return Ok(());
    };
    let output_dir = PathBuf::from(shellexpand::tilde(&output_dir).into_owned());

    // ── Step 7: Confirmation ────────────────────────────────────────────────

    eprintln!();
    let bold = Style::new().for_stderr().bold();
    eprintln!(
        "  {}",
        bold.apply_to(format!("Ready to write a story from {} image(s)", images.len()))
    );
    eprintln!(
        "  {}",
        dim.apply_to(format!(
            "Genre: {genre} | Length: ~{words} words | Text: {} | Speech: {} | Output: {}",
            choice.selector.text,
            choice.selector.speech,
            output_dir.display()
        ))
    );
    eprintln!();

    let confirm = Confirm::with_theme(&theme)
        .with_prompt("Start writing?")
        .default(true)
        .interact_opt()?;
    if !matches!(confirm, Some(true)) {
        return Ok(());
    }

    // ── Step 8: Build GenerateArgs and delegate ─────────────────────────────

    let args = GenerateArgs {
        images,
        context,
        genre: Some(genre),
        words: Some(words.get()),
        text_backend: Some(choice.selector.text),
        speech_backend: Some(choice.selector.speech),
        model: choice.model,
        seed: None,
        output_dir,
        name: "story".to_string(),
        json: false,
    };

    // A failed stage is reported here rather than ending interactive mode
    if let Err(e) = crate::cli::generate::execute(args, choice.config).await {
        let err = Style::new().for_stderr().red();
        eprintln!("  {} {e}", err.apply_to("✗"));
    }

    // ── Post-story menu ─────────────────────────────────────────────────────

    eprintln!();
    let post_items = &["Write another story", "Back to main menu"];
    let post_choice = Select::with_theme(&theme)
        .with_prompt("What next?")
        .items(post_items)
        .default(0)
        .interact_opt()?;

    if matches!(post_choice, Some(0)) {
        Box::pin(guided_story(config)).await?;
    }

    Ok(())
}

/// Prompt for image files or folders until the user stops adding.
///
/// Returns `Ok(None)` if the user interrupts.
fn prompt_images(config: &Config) -> anyhow::Result<Option<Vec<PathBuf>>> {
    let theme = storyloom_theme();
    let warn = Style::new().for_stderr().yellow();
    let dim = Style::new().for_stderr().dim();
    let mut images: Vec<PathBuf> = Vec::new();

    eprintln!(
        "  {}",
        dim.apply_to("Upload images (only PNG, JPG, and JPEG formats allowed)")
    );

    loop {
        let Some(raw_path) = super::handle_interrupt(
            Input::<String>::with_theme(&theme)
                .with_prompt("Path to image or folder")
                .interact_text(),
        )?
        else {
            return Ok(None);
        };

        let path = PathBuf::from(shellexpand::tilde(raw_path.trim()).into_owned());
        if !path.exists() {
            eprintln!(
                "  {}",
                warn.apply_to(format!("Path not found: {}", path.display()))
            );
            continue;
        }

        let found = collect_images(&path)?;
        if found.is_empty() {
            eprintln!(
                "  {}",
                warn.apply_to("No PNG, JPG, or JPEG images found at that path.")
            );
            continue;
        }
        images.extend(found);

        eprintln!(
            "  {}",
            dim.apply_to(format!("{} image(s) selected", images.len()))
        );
        if images.len() >= config.limits.max_images {
            if images.len() > config.limits.max_images {
                eprintln!(
                    "  {}",
                    warn.apply_to(format!(
                        "Only the first {} images will be used.",
                        config.limits.max_images
                    ))
                );
            }
            return Ok(Some(images));
        }

        match Confirm::with_theme(&theme)
            .with_prompt("Add more images?")
            .default(false)
            .interact_opt()?
        {
            Some(true) => continue,
            Some(false) => return Ok(Some(images)),
            None => return Ok(None),
        }
    }
}

/// Genre selector: the fixed vocabulary plus a free-text option.
fn select_genre(
    config: &Config,
    theme: &dialoguer::theme::ColorfulTheme,
) -> anyhow::Result<Option<Genre>> {
    let vocabulary = Genre::vocabulary();
    let mut items: Vec<String> = vocabulary.iter().map(|g| g.label().to_string()).collect();
    items.push("Other...".to_string());

    let configured = Genre::from(config.story.default_genre.clone());
    let default = vocabulary.iter().position(|g| *g == configured).unwrap_or(0);

    let Some(idx) = Select::with_theme(theme)
        .with_prompt("Genre")
        .items(&items)
        .default(default)
        .interact_opt()?
    else {
        return Ok(None);
    };

    if let Some(genre) = vocabulary.get(idx) {
        return Ok(Some(genre.clone()));
    }

    let Some(custom) = super::handle_interrupt(
        Input::<String>::with_theme(theme)
            .with_prompt("Genre name")
            .interact_text(),
    )?
    else {
        return Ok(None);
    };
    Ok(Some(Genre::from(custom)))
}

/// Images at `path`: the file itself, or the supported files directly
/// inside a folder, sorted by name.
fn collect_images(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(if has_allowed_extension(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut found: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_allowed_extension(p))
        .collect();
    found.sort();
    Ok(found)
}
