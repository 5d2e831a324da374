use anyhow::{Context, Result};
use tera::{Context as TeraContext, Tera};

use crate::batch::TranslationBatch;
use crate::languages;

const TRANSLATION_TEMPLATE: &str = include_str!("prompts/translation.tera");

const SYSTEM_PROMPT: &str = "You are a professional translator.";

pub fn render_system_prompt(app_context: Option<&str>) -> String {
    match app_context {
        Some(context) if !context.trim().is_empty() => format!(
            "{SYSTEM_PROMPT}\n\nContext about the app being localized:\n{}",
            context.trim()
        ),
        _ => SYSTEM_PROMPT.to_string(),
    }
}

pub fn render_user_prompt(batch: &TranslationBatch) -> Result<String> {
    let strings_json = serde_json::to_string_pretty(&batch.units)
        .with_context(|| "failed to serialize batch units")?;
    let mut context = TeraContext::new();
    context.insert(
        "target_language",
        &languages::display_name(&batch.target_lang),
    );
    context.insert("strings_json", &strings_json);
    Tera::one_off(TRANSLATION_TEMPLATE, &context, false)
        .with_context(|| "failed to render translation prompt")
}
