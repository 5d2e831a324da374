use anyhow::{Result, anyhow};
use std::fs;
use std::path::PathBuf;

const API_KEY_ENV: &str = "OPENAI_API_KEY";
const ENV_FILE_NAME: &str = ".env";

/// Resolves the completion-endpoint API key: the process environment first,
/// then `.env` files in the working directory, its parent, and beside the
/// executable. First non-empty value wins. A missing key is a setup failure
/// raised before any catalog work starts.
pub fn resolve_api_key() -> Result<String> {
    if let Some(key) = get_env(API_KEY_ENV) {
        return Ok(key);
    }
    resolve_from_files(&candidate_env_files()).ok_or_else(|| {
        anyhow!(
            "{} not found in the environment or any .env file (checked ./{}, ../{}, and next to the executable)",
            API_KEY_ENV,
            ENV_FILE_NAME,
            ENV_FILE_NAME
        )
    })
}

fn candidate_env_files() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(ENV_FILE_NAME),
        PathBuf::from("..").join(ENV_FILE_NAME),
    ];
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            paths.push(dir.join(ENV_FILE_NAME));
        }
    }
    paths
}

fn resolve_from_files(paths: &[PathBuf]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| fs::read_to_string(path).ok())
        .find_map(|content| key_from_env_file(&content, API_KEY_ENV))
}

fn key_from_env_file(content: &str, name: &str) -> Option<String> {
    content
        .lines()
        .filter_map(parse_env_line)
        .find_map(|(key, value)| (key == name && !value.is_empty()).then_some(value))
}

fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let value = value.trim().trim_matches('"').trim_matches('\'');
    Some((key.trim().to_string(), value.to_string()))
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
