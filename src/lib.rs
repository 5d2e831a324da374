use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, error, info, warn};

pub mod batch;
pub mod catalog;
pub mod client;
pub mod credentials;
pub mod extract;
pub mod languages;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod settings;
pub mod validation;

#[cfg(test)]
mod test_util;

use catalog::CatalogFile;
use client::OpenAiClient;
use progress::Progress;

#[derive(Debug, Clone)]
pub struct Config {
    pub input_file: String,
    pub source_lang: String,
    pub target_lang: String,
    pub app_context_path: String,
    pub chunk_word_size: Option<usize>,
    pub max_attempts: Option<usize>,
    pub model: Option<String>,
    pub settings_path: Option<String>,
}

pub async fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    // Resolved before the catalog is touched: a missing key must fail the
    // run without reading the input file.
    let api_key = credentials::resolve_api_key()?;

    let mut catalog_file = CatalogFile::load(Path::new(&config.input_file))?;
    report_schema_issues(&catalog_file, "loaded")?;

    let snapshot = catalog_file.catalog.clone();
    let items = extract::extract_units(
        &mut catalog_file.catalog,
        &config.source_lang,
        &config.target_lang,
    );
    catalog_file
        .save()
        .with_context(|| "failed to persist synthesized source strings")?;

    if items.is_empty() {
        info!("no strings need translation");
        return Ok("No strings need translation".to_string());
    }

    let words_per_chunk = config.chunk_word_size.unwrap_or(settings.words_per_chunk);
    let max_attempts = config.max_attempts.unwrap_or(settings.max_attempts);
    let model = config.model.unwrap_or_else(|| settings.model.clone());

    let batches = batch::chunk_units(
        items,
        words_per_chunk,
        &config.source_lang,
        &config.target_lang,
    );
    let total_strings = batches.iter().map(|batch| batch.len()).sum();
    let mut progress = Progress::new(batches.len(), total_strings);
    info!(
        "translating {total_strings} strings from {} to {} in {} chunks",
        config.source_lang,
        config.target_lang,
        batches.len()
    );

    let mut translation_client = OpenAiClient::new(api_key, model)
        .with_temperature(settings.temperature)
        .with_cost_per_1k_tokens(settings.cost_per_1k_tokens)
        .with_app_context(load_app_context(&config.app_context_path));

    for batch in &batches {
        info!(
            "chunk {}/{}: translating {} strings",
            batch.chunk_index + 1,
            batch.chunk_count,
            batch.len()
        );
        match retry::translate_with_retry(&mut translation_client, batch, max_attempts).await {
            Ok(outcome) => {
                for result in &outcome.results {
                    let report =
                        validation::check_translation(&result.original, &result.translated);
                    for issue in &report.errors {
                        warn!("{}: {issue}", result.path);
                    }
                }
                catalog::apply_translations(&mut catalog_file.catalog, &outcome.results);
                catalog_file
                    .save()
                    .with_context(|| "failed to save catalog after chunk")?;
                progress.record_results(&outcome.results);
            }
            // One chunk exhausting its retries must not sink the rest of
            // the run; its paths land in the summary for a targeted re-run.
            Err(err) => {
                error!(
                    "chunk {}/{} failed after {max_attempts} attempts: {err}",
                    batch.chunk_index + 1,
                    batch.chunk_count
                );
                progress.record_failed_batch(batch);
            }
        }
    }

    let shape = validation::check_structure_preserved(&snapshot, &catalog_file.catalog);
    for issue in &shape.errors {
        warn!("structure check: {issue}");
    }
    report_schema_issues(&catalog_file, "saved")?;

    let usage = translation_client.usage();
    Ok(format!(
        "Translation completed: {}. Tokens used: {}, cost: ${:.4}",
        progress.summary(),
        usage.total_tokens,
        usage.total_cost_usd
    ))
}

fn report_schema_issues(catalog_file: &CatalogFile, stage: &str) -> Result<()> {
    let value = serde_json::to_value(&catalog_file.catalog)
        .with_context(|| "failed to serialize catalog for schema check")?;
    let report = validation::check_catalog_schema(&value);
    for issue in &report.errors {
        warn!("schema check on {stage} catalog: {issue}");
    }
    Ok(())
}

fn load_app_context(path: &str) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => {
            info!("using app context from {path}");
            Some(content)
        }
        Ok(_) => None,
        Err(err) => {
            debug!("no app context at {path}: {err}");
            None
        }
    }
}
