//! Backend setup: text and speech backend choice, API key detection, input,
//! and optional persistence.

use console::Style;
use dialoguer::{Confirm, Input, Password, Select};
use std::path::Path;
use storyloom_core::{BackendSelector, Config, SpeechBackend, TextBackend};

use super::theme::storyloom_theme;

/// A backend that authenticates with an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyedBackend {
    Gemini,
    Groq,
    Openai,
    ElevenLabs,
}

impl From<TextBackend> for KeyedBackend {
    fn from(backend: TextBackend) -> Self {
        match backend {
            TextBackend::Gemini => KeyedBackend::Gemini,
            TextBackend::Groq => KeyedBackend::Groq,
            TextBackend::Openai => KeyedBackend::Openai,
        }
    }
}

impl KeyedBackend {
    /// The local speech backend needs no key.
    pub(crate) fn for_speech(backend: SpeechBackend) -> Option<Self> {
        match backend {
            SpeechBackend::Elevenlabs => Some(KeyedBackend::ElevenLabs),
            SpeechBackend::Local => None,
        }
    }

    /// `(table, section)` holding the key in the config file.
    fn config_table(self) -> (&'static str, &'static str) {
        match self {
            KeyedBackend::Gemini => ("llm", "gemini"),
            KeyedBackend::Groq => ("llm", "groq"),
            KeyedBackend::Openai => ("llm", "openai"),
            KeyedBackend::ElevenLabs => ("speech", "elevenlabs"),
        }
    }
}

/// Result of the backend selection flow.
pub struct BackendChoice {
    pub selector: BackendSelector,
    /// Text/vision model override, when the user changed the default
    pub model: Option<String>,
    /// Config with any session-only keys injected
    pub config: Config,
}

/// Guide the user through choosing backends and supplying missing keys.
///
/// Returns `None` if the user cancels.
pub async fn select_backends(config: &Config) -> anyhow::Result<Option<BackendChoice>> {
    let theme = storyloom_theme();
    let mut session = config.clone();

    // Step 1: Text/vision backend
    let text_backends = [TextBackend::Gemini, TextBackend::Groq, TextBackend::Openai];
    let text_items: Vec<String> = text_backends
        .iter()
        .map(|b| backend_item(KeyedBackend::from(*b), config))
        .collect();
    let default_text = text_backends
        .iter()
        .position(|b| *b == config.backends.text)
        .unwrap_or(0);

    let Some(text_idx) = Select::with_theme(&theme)
        .with_prompt("Story model provider")
        .items(&text_items)
        .default(default_text)
        .interact_opt()?
    else {
        return Ok(None);
    };
    let text = text_backends[text_idx];

    if !ensure_key(KeyedBackend::from(text), &mut session)? {
        return Ok(None);
    }

    // Step 2: Model
    let Some(model) = select_model(text, config, &theme)? else {
        return Ok(None);
    };

    // Step 3: Speech backend
    let speech_items = &[
        "ElevenLabs (hosted)",
        "Local Kokoro model (needs espeak-ng, ~340 MB download)",
    ];
    let default_speech = match config.backends.speech {
        SpeechBackend::Elevenlabs => 0,
        SpeechBackend::Local => 1,
    };
    let speech = match Select::with_theme(&theme)
        .with_prompt("Narration provider")
        .items(speech_items)
        .default(default_speech)
        .interact_opt()?
    {
        Some(0) => SpeechBackend::Elevenlabs,
        Some(_) => SpeechBackend::Local,
        None => return Ok(None),
    };

    match KeyedBackend::for_speech(speech) {
        Some(keyed) => {
            if !ensure_key(keyed, &mut session)? {
                return Ok(None);
            }
        }
        None => {
            if !ensure_local_assets(config, &theme).await? {
                return Ok(None);
            }
        }
    }

    Ok(Some(BackendChoice {
        selector: BackendSelector { text, speech },
        model,
        config: session,
    }))
}

/// Make sure `backend` has a key, prompting for one if needed.
///
/// Returns `false` if the user skipped or cancelled.
fn ensure_key(backend: KeyedBackend, session: &mut Config) -> anyhow::Result<bool> {
    let theme = storyloom_theme();
    let dim = Style::new().for_stderr().dim();
    let warn = Style::new().for_stderr().yellow();

    let env_var = env_var_for(backend);
    let env_set = std::env::var(env_var).is_ok_and(|v| !v.is_empty());
    if env_set || config_has_key(session, backend) {
        eprintln!(
            "  {}",
            dim.apply_to(format!("Using existing API key from {env_var} / config"))
        );
        return Ok(true);
    }

    eprintln!("  {}", warn.apply_to(format!("{env_var} not set.")));

    let key: String = match Password::with_theme(&theme)
        .with_prompt(format!(
            "Enter your {} API key (Esc to skip)",
            backend_label(backend)
        ))
        .allow_empty_password(true)
        .interact()
    {
        Ok(k) if !k.trim().is_empty() => k.trim().to_string(),
        _ => return Ok(false),
    };

    let save_options = &["Yes, save to config file", "No, use for this session only"];
    match Select::with_theme(&theme)
        .with_prompt("Save this key for future sessions?")
        .items(save_options)
        .default(0)
        .interact_opt()?
    {
        Some(0) => {
            let path = Config::default_path();
            match save_key_to(&path, backend, &key) {
                Ok(()) => eprintln!(
                    "  {}",
                    dim.apply_to(format!("Key saved to {}", path.display()))
                ),
                Err(e) => {
                    eprintln!(
                        "  {}",
                        warn.apply_to(format!("Could not save to config: {e}"))
                    );
                    eprintln!("  Using key for this session only.");
                }
            }
        }
        Some(_) => {}
        None => return Ok(false),
    }

    inject_api_key(session, backend, key);
    Ok(true)
}

/// Prompt for the text/vision model, defaulting to the configured one.
///
/// Returns `Ok(Some(None))` when the configured model is kept.
fn select_model(
    backend: TextBackend,
    config: &Config,
    theme: &dialoguer::theme::ColorfulTheme,
) -> anyhow::Result<Option<Option<String>>> {
    let configured = configured_model(backend, config);
    let Some(model) = super::handle_interrupt(
        Input::<String>::with_theme(theme)
            .with_prompt(format!("{} model", backend_label(backend.into())))
            .default(configured.clone())
            .interact_text(),
    )?
    else {
        return Ok(None);
    };

    let model = model.trim().to_string();
    if model.is_empty() || model == configured {
        Ok(Some(None))
    } else {
        Ok(Some(Some(model)))
    }
}

/// Check the local asset pair and offer to download it.
async fn ensure_local_assets(
    config: &Config,
    theme: &dialoguer::theme::ColorfulTheme,
) -> anyhow::Result<bool> {
    let status = crate::cli::assets::check_installed(config);
    if status.iter().all(|s| s.is_present()) {
        return Ok(true);
    }

    let warn = Style::new().for_stderr().yellow();
    eprintln!("  {}", warn.apply_to("Local speech assets not downloaded."));

    match Confirm::with_theme(theme)
        .with_prompt("Download them now?")
        .default(true)
        .interact_opt()?
    {
        Some(true) => {
            crate::cli::assets::download(config).await?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Select item text, flagging backends that still need a key.
fn backend_item(backend: KeyedBackend, config: &Config) -> String {
    let label = backend_label(backend);
    let env_set = std::env::var(env_var_for(backend)).is_ok_and(|v| !v.is_empty());
    if env_set || config_has_key(config, backend) {
        label.to_string()
    } else {
        format!("{label} (needs API key)")
    }
}

fn configured_model(backend: TextBackend, config: &Config) -> String {
    match backend {
        TextBackend::Gemini => config.llm.gemini.clone().unwrap_or_default().model,
        TextBackend::Groq => config.llm.groq.clone().unwrap_or_default().model,
        TextBackend::Openai => config.llm.openai.clone().unwrap_or_default().model,
    }
}

/// Get the environment variable name for a backend's API key.
pub(crate) fn env_var_for(backend: KeyedBackend) -> &'static str {
    match backend {
        KeyedBackend::Gemini => "GOOGLE_API_KEY",
        KeyedBackend::Groq => "GROQ_API_KEY",
        KeyedBackend::Openai => "OPENAI_API_KEY",
        KeyedBackend::ElevenLabs => "ELEVENLABS_API_KEY",
    }
}

/// Human-readable label for a backend.
pub(crate) fn backend_label(backend: KeyedBackend) -> &'static str {
    match backend {
        KeyedBackend::Gemini => "Google Gemini",
        KeyedBackend::Groq => "Groq",
        KeyedBackend::Openai => "OpenAI",
        KeyedBackend::ElevenLabs => "ElevenLabs",
    }
}

/// The key stored in config for `backend`, if any.
fn configured_key(config: &Config, backend: KeyedBackend) -> Option<&str> {
    match backend {
        KeyedBackend::Gemini => config.llm.gemini.as_ref().map(|c| c.api_key.as_str()),
        KeyedBackend::Groq => config.llm.groq.as_ref().map(|c| c.api_key.as_str()),
        KeyedBackend::Openai => config.llm.openai.as_ref().map(|c| c.api_key.as_str()),
        KeyedBackend::ElevenLabs => config
            .speech
            .elevenlabs
            .as_ref()
            .map(|c| c.api_key.as_str()),
    }
}

/// Check if the config already has a literal API key for the backend.
pub(crate) fn config_has_key(config: &Config, backend: KeyedBackend) -> bool {
    configured_key(config, backend).is_some_and(|k| !k.is_empty() && !k.starts_with("${"))
}

/// Put a session-only key into the in-memory config.
pub(crate) fn inject_api_key(config: &mut Config, backend: KeyedBackend, key: String) {
    match backend {
        KeyedBackend::Gemini => {
            config.llm.gemini.get_or_insert_with(Default::default).api_key = key;
        }
        KeyedBackend::Groq => {
            config.llm.groq.get_or_insert_with(Default::default).api_key = key;
        }
        KeyedBackend::Openai => {
            config.llm.openai.get_or_insert_with(Default::default).api_key = key;
        }
        KeyedBackend::ElevenLabs => {
            config
                .speech
                .elevenlabs
                .get_or_insert_with(Default::default)
                .api_key = key
        }
    }
}

/// Save an API key to the config file at `path`, preserving comments and
/// every other setting.
pub(crate) fn save_key_to(path: &Path, backend: KeyedBackend, key: &str) -> anyhow::Result<()> {
    let content = if path.exists() {
        std::fs::read_to_string(path)?
    } else {
        String::new()
    };

    let mut doc: toml_edit::DocumentMut = content.parse()?;
    let (table, section) = backend.config_table();

    if !doc.contains_key(table) {
        doc[table] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    if !doc[table].as_table().is_some_and(|t| t.contains_key(section)) {
        doc[table][section] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[table][section]["api_key"] = toml_edit::value(key);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, doc.to_string())?;
    tracing::debug!("Saved {} key to {}", backend_label(backend), path.display());

    Ok(())
}
