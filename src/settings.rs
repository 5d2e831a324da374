use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub model: String,
    pub temperature: f32,
    pub cost_per_1k_tokens: f64,
    pub words_per_chunk: usize,
    pub max_attempts: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "gpt-4-turbo-preview".to_string(),
            temperature: 0.3,
            cost_per_1k_tokens: 0.01,
            words_per_chunk: 30,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    translator: Option<TranslatorSettings>,
    batching: Option<BatchingSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslatorSettings {
    model: Option<String>,
    temperature: Option<f32>,
    cost_per_1k_tokens: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchingSettings {
    words_per_chunk: Option<usize>,
    max_attempts: Option<usize>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(translator) = incoming.translator {
            if let Some(model) = translator.model {
                if !model.trim().is_empty() {
                    self.model = model;
                }
            }
            if let Some(temperature) = translator.temperature {
                if (0.0..=2.0).contains(&temperature) {
                    self.temperature = temperature;
                }
            }
            if let Some(rate) = translator.cost_per_1k_tokens {
                if rate >= 0.0 {
                    self.cost_per_1k_tokens = rate;
                }
            }
        }
        if let Some(batching) = incoming.batching {
            if let Some(words) = batching.words_per_chunk {
                if words > 0 {
                    self.words_per_chunk = words;
                }
            }
            if let Some(attempts) = batching.max_attempts {
                if attempts > 0 {
                    self.max_attempts = attempts;
                }
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".xcstrings-translator"))
        }
    })
}
