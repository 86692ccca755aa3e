//! The `storyloom generate` command.
//!
//! Reads the images, runs the pipeline behind a spinner, prints the story
//! to stdout and writes `<name>.txt` / `<name>.wav` into the output
//! directory. A failed stage still prints whatever was produced before it
//! and then exits non-zero, and so does a failed write.

use anyhow::Context;
use clap::Args;
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use storyloom_core::{
    genre_rng, load_images, BackendSelector, Config, Genre, PipelineOutcome, ProviderFactory,
    SpeechBackend, StoryPipeline, StoryRequest, TextBackend, WordLimit,
};

/// Arguments for the `generate` command.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Image files (PNG, JPG, JPEG), in story order
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Optional context for the story (characters, setting, events)
    #[arg(short, long)]
    pub context: Option<String>,

    /// Genre: random, fantasy, science-fiction, mystery, romance, horror,
    /// comedy, thriller, or any other text
    #[arg(short, long)]
    pub genre: Option<Genre>,

    /// Approximate story length in words (50, 100, 150, 200, 250, 300)
    #[arg(short, long)]
    pub words: Option<u32>,

    /// Text/vision backend (gemini, groq, openai)
    #[arg(long)]
    pub text_backend: Option<TextBackend>,

    /// Speech backend (elevenlabs, local)
    #[arg(long)]
    pub speech_backend: Option<SpeechBackend>,

    /// Text/vision model name, overriding the configured one
    #[arg(long)]
    pub model: Option<String>,

    /// Seed for resolving the "random" genre
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory for the story text and narration
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Base file name for the outputs
    #[arg(long, default_value = "story")]
    pub name: String,

    /// Print a JSON report instead of the plain story
    #[arg(long)]
    pub json: bool,
}

/// Files written for one run.
#[derive(Debug, Default, Serialize)]
struct SavedFiles {
    #[serde(skip_serializing_if = "Option::is_none")]
    story_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_path: Option<PathBuf>,
}

/// Machine-readable summary printed with `--json`.
#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    outcome: &'a PipelineOutcome,
    text_backend: &'a str,
    speech_backend: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    warnings: &'a [String],
    #[serde(flatten)]
    files: &'a SavedFiles,
}

/// Execute the generate command.
pub async fn execute(args: GenerateArgs, config: Config) -> anyhow::Result<()> {
    let word_limit = WordLimit::new(args.words.unwrap_or(config.story.default_word_limit))?;
    let genre = args
        .genre
        .clone()
        .unwrap_or_else(|| Genre::from(config.story.default_genre.clone()));
    let selector = BackendSelector {
        text: args.text_backend.unwrap_or(config.backends.text),
        speech: args.speech_backend.unwrap_or(config.backends.speech),
    };

    let mut factory = ProviderFactory::new();
    if let Some(model) = &args.model {
        factory = factory.with_model(model.clone());
    }
    let backends = factory.build(selector, &config)?;
    let pipeline = StoryPipeline::new(backends);

    let intake = load_images(&args.images, &config.limits).await;
    let warn = Style::new().for_stderr().yellow();
    for warning in &intake.warnings {
        eprintln!("  {} {warning}", warn.apply_to("!"));
    }

    tracing::info!(
        "Writing a {} story (~{} words) from {} image(s) with {} + {}",
        genre,
        word_limit,
        intake.images.len(),
        pipeline.backends().text_backend_name(),
        pipeline.backends().speech_backend_name()
    );

    let request = StoryRequest {
        context: args.context.clone(),
        images: intake.images,
        genre,
        word_limit,
    };

    let mut rng = genre_rng(args.seed.or(config.story.seed));
    let spinner = create_spinner();
    let outcome = pipeline
        .run(&request, &mut rng, |stage| spinner.set_message(stage.to_string()))
        .await;
    spinner.finish_and_clear();

    let (files, save_errors) = save_outputs(&args.output_dir, &args.name, &outcome);
    let note = outcome.advisory_note(request.context.as_deref());

    if args.json {
        let mut warnings = intake.warnings.clone();
        warnings.extend(save_errors.iter().cloned());
        let report = Report {
            outcome: &outcome,
            text_backend: pipeline.backends().text_backend_name(),
            speech_backend: pipeline.backends().speech_backend_name(),
            note,
            warnings: &warnings,
            files: &files,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&outcome, note.as_deref(), &files, &save_errors);
    }

    if let Some(message) = outcome.error() {
        anyhow::bail!("{message}");
    }
    if !save_errors.is_empty() {
        anyhow::bail!("Could not save outputs to {}", args.output_dir.display());
    }
    Ok(())
}

/// Write the story text and narration, whichever exist.
///
/// Write failures come back as messages rather than errors so the caller
/// can still print the story.
fn save_outputs(dir: &Path, name: &str, outcome: &PipelineOutcome) -> (SavedFiles, Vec<String>) {
    let mut files = SavedFiles::default();
    let mut errors = Vec::new();
    if outcome.story().is_none() && outcome.audio().is_none() {
        return (files, errors);
    }

    if let Err(e) = std::fs::create_dir_all(dir)
        .with_context(|| format!("Could not create output directory {}", dir.display()))
    {
        errors.push(format!("{e:#}"));
        return (files, errors);
    }

    if let Some(story) = outcome.story() {
        match write_output(dir, &format!("{name}.txt"), format!("{story}\n").as_bytes()) {
            Ok(path) => files.story_path = Some(path),
            Err(e) => errors.push(format!("{e:#}")),
        }
    }

    if let Some(audio) = outcome.audio() {
        match write_output(dir, &format!("{name}.wav"), audio) {
            Ok(path) => files.audio_path = Some(path),
            Err(e) => errors.push(format!("{e:#}")),
        }
    }

    (files, errors)
}

fn write_output(dir: &Path, file_name: &str, contents: &[u8]) -> anyhow::Result<PathBuf> {
    let path = dir.join(file_name);
    std::fs::write(&path, contents)
        .with_context(|| format!("Could not save {}", path.display()))?;
    Ok(path)
}

/// Story on stdout, everything else on stderr.
fn print_summary(
    outcome: &PipelineOutcome,
    note: Option<&str>,
    files: &SavedFiles,
    save_errors: &[String],
) {
    let bold = Style::new().for_stderr().bold();
    let dim = Style::new().for_stderr().dim();
    let warn = Style::new().for_stderr().yellow();
    let green = Style::new().for_stderr().green();

    if let Some(note) = note {
        eprintln!("  {}", warn.apply_to(note));
    }

    if let Some(story) = outcome.story() {
        eprintln!();
        eprintln!("  {}", bold.apply_to(format!("Genre: {}", outcome.genre())));
        eprintln!();
        println!("{story}");
        eprintln!();
    }

    if let Some(path) = &files.story_path {
        eprintln!("  {} Story saved to {}", green.apply_to("✓"), path.display());
    }
    if let Some(path) = &files.audio_path {
        let size = outcome.audio().map_or(0, <[u8]>::len);
        eprintln!(
            "  {} Narration saved to {} {}",
            green.apply_to("✓"),
            path.display(),
            dim.apply_to(format!("({:.1} KB)", size as f64 / 1024.0))
        );
    }
    for error in save_errors {
        eprintln!("  {} {error}", warn.apply_to("!"));
    }
}

fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use storyloom_core::PromptEvaluation;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: GenerateArgs,
    }

    fn completed() -> PipelineOutcome {
        PipelineOutcome::Completed {
            evaluation: PromptEvaluation::valid("story request"),
            genre: Genre::Mystery,
            story: "The lighthouse went dark.".into(),
            audio: b"RIFF....WAVE".to_vec(),
        }
    }

    #[test]
    fn test_args_parse_backends_and_genre() {
        let cli = TestCli::parse_from([
            "test",
            "a.png",
            "b.jpg",
            "--genre",
            "science fiction",
            "--words",
            "150",
            "--text-backend",
            "groq",
            "--speech-backend",
            "local",
        ]);
        assert_eq!(cli.args.images.len(), 2);
        assert_eq!(cli.args.genre, Some(Genre::ScienceFiction));
        assert_eq!(cli.args.words, Some(150));
        assert_eq!(cli.args.text_backend, Some(TextBackend::Groq));
        assert_eq!(cli.args.speech_backend, Some(SpeechBackend::Local));
        assert_eq!(cli.args.output_dir, PathBuf::from("."));
        assert_eq!(cli.args.name, "story");
    }

    #[test]
    fn test_args_reject_unknown_backend() {
        let result = TestCli::try_parse_from(["test", "a.png", "--text-backend", "anthropic"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_args_require_images() {
        assert!(TestCli::try_parse_from(["test"]).is_err());
    }

    #[test]
    fn test_save_outputs_writes_story_and_audio() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        let (files, errors) = save_outputs(&out, "tale", &completed());
        assert!(errors.is_empty());

        let story_path = files.story_path.unwrap();
        assert_eq!(story_path, out.join("tale.txt"));
        assert_eq!(
            std::fs::read_to_string(&story_path).unwrap(),
            "The lighthouse went dark.\n"
        );
        assert_eq!(std::fs::read(files.audio_path.unwrap()).unwrap(), b"RIFF....WAVE");
    }

    #[test]
    fn test_save_outputs_keeps_story_when_narration_failed() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = PipelineOutcome::SynthesisFailed {
            evaluation: PromptEvaluation::invalid("Empty prompt"),
            genre: Genre::Comedy,
            story: "A duck walked into a bar.".into(),
            message: "Audio Generation Failed: API Error 500".into(),
        };

        let (files, errors) = save_outputs(dir.path(), "story", &outcome);
        assert!(errors.is_empty());
        assert!(files.story_path.is_some());
        assert!(files.audio_path.is_none());
        assert!(!dir.path().join("story.wav").exists());
    }

    #[test]
    fn test_save_outputs_writes_nothing_when_generation_failed() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never");
        let outcome = PipelineOutcome::GenerationFailed {
            evaluation: PromptEvaluation::invalid("Empty prompt"),
            genre: Genre::Horror,
            message: "Story Generation Failed. Please Attach Images.".into(),
        };

        let (files, errors) = save_outputs(&out, "story", &outcome);
        assert!(errors.is_empty());
        assert!(files.story_path.is_none());
        assert!(!out.exists());
    }

    #[test]
    fn test_save_outputs_under_a_file_reports_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let out = blocker.join("out");

        let outcome = completed();
        let (files, errors) = save_outputs(&out, "story", &outcome);

        assert!(files.story_path.is_none());
        assert!(files.audio_path.is_none());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Could not create output directory"));
        assert!(errors[0].contains("blocker"));
        // The story is still there to print
        assert_eq!(outcome.story(), Some("The lighthouse went dark."));
    }

    #[test]
    fn test_save_outputs_keeps_written_files_when_one_write_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the narration path makes that write fail
        std::fs::create_dir(dir.path().join("story.wav")).unwrap();

        let (files, errors) = save_outputs(dir.path(), "story", &completed());

        assert_eq!(files.story_path, Some(dir.path().join("story.txt")));
        assert!(files.audio_path.is_none());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("story.wav"));
    }

    #[test]
    fn test_json_report_shape() {
        let outcome = completed();
        let files = SavedFiles {
            story_path: Some(PathBuf::from("out/story.txt")),
            audio_path: None,
        };
        let report = Report {
            outcome: &outcome,
            text_backend: "gemini",
            speech_backend: "elevenlabs",
            note: None,
            warnings: &[],
            files: &files,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "completed");
        assert_eq!(json["genre"], "Mystery");
        assert_eq!(json["story"], "The lighthouse went dark.");
        assert_eq!(json["audio_bytes"], 12);
        assert_eq!(json["text_backend"], "gemini");
        assert_eq!(json["story_path"], "out/story.txt");
        assert!(json.get("note").is_none());
        assert!(json.get("audio_path").is_none());
    }
}
