use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::backoff::{
    RATE_LIMIT_BASE_DELAY, RATE_LIMIT_MAX_RETRIES, is_rate_limited, retry_after, wait_with_backoff,
};
use super::prompt::{render_system_prompt, render_user_prompt};
use super::{BackendFuture, TranslationBackend, TranslationError, UsageStats};
use crate::batch::{TranslationBatch, TranslationResult};
use crate::catalog::state;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions client. One request per batch, temperature pinned low,
/// JSON object output mode. Rate-limited replies are absorbed here with
/// bounded backoff; everything else surfaces as a `TranslationError` for
/// the retry controller to deal with at batch granularity.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    key: String,
    model: String,
    temperature: f32,
    cost_per_1k_tokens: f64,
    app_context: Option<String>,
    usage: UsageStats,
}

impl OpenAiClient {
    pub fn new(key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            key: key.into(),
            model: model.into(),
            temperature: 0.3,
            cost_per_1k_tokens: 0.01,
            app_context: None,
            usage: UsageStats::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_cost_per_1k_tokens(mut self, rate: f64) -> Self {
        self.cost_per_1k_tokens = rate;
        self
    }

    pub fn with_app_context(mut self, context: Option<String>) -> Self {
        self.app_context = context.filter(|text| !text.trim().is_empty());
        self
    }

    pub fn usage(&self) -> UsageStats {
        self.usage
    }

    fn record_usage(&mut self, total_tokens: u64) {
        self.usage.total_tokens += total_tokens;
        self.usage.total_cost_usd += (total_tokens as f64 / 1000.0) * self.cost_per_1k_tokens;
    }

    async fn request_completion(&self, body: &Value) -> Result<String, TranslationError> {
        let url = format!("{}/chat/completions", base_url());
        let mut attempt = 0usize;
        let mut delay = RATE_LIMIT_BASE_DELAY;
        loop {
            attempt += 1;
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.key)
                .json(body)
                .send()
                .await?;

            let status = response.status();
            let retry_after = retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            if status.is_success() {
                return Ok(text);
            }
            if is_rate_limited(status, &text) && attempt < RATE_LIMIT_MAX_RETRIES {
                delay = wait_with_backoff(attempt, delay, retry_after).await;
                continue;
            }
            return Err(TranslationError::Endpoint {
                status,
                detail: extract_error_detail(&text).unwrap_or(text),
            });
        }
    }
}

impl TranslationBackend for OpenAiClient {
    fn translate_batch<'a>(&'a mut self, batch: &'a TranslationBatch) -> BackendFuture<'a> {
        Box::pin(async move {
            debug!(
                "translating batch of {} strings to {}",
                batch.len(),
                batch.target_lang
            );
            let system_prompt = render_system_prompt(self.app_context.as_deref());
            let user_prompt = render_user_prompt(batch).map_err(TranslationError::Prompt)?;
            let body = json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_prompt}
                ],
                "temperature": self.temperature,
                "response_format": {"type": "json_object"}
            });

            let text = self.request_completion(&body).await?;
            let reply = extract_reply(&text)?;
            if let Some(total_tokens) = reply.total_tokens {
                self.record_usage(total_tokens);
                debug!(
                    "token usage: {total_tokens}, running cost: ${:.4}",
                    self.usage.total_cost_usd
                );
            }
            let translations = parse_translations(&reply.content, batch.len())?;
            Ok(zip_results(batch, translations))
        })
    }
}

#[derive(Debug)]
struct ChatReply {
    content: String,
    total_tokens: Option<u64>,
}

fn extract_reply(text: &str) -> Result<ChatReply, TranslationError> {
    let payload: ChatResponse =
        serde_json::from_str(text).map_err(|err| TranslationError::MalformedReply {
            reason: format!("response body is not valid JSON: {err}"),
        })?;
    let total_tokens = payload.usage.and_then(|usage| usage.total_tokens);
    let content = payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| TranslationError::MalformedReply {
            reason: "response carries no message content".to_string(),
        })?;
    Ok(ChatReply {
        content,
        total_tokens,
    })
}

/// The reply shape is requested, not guaranteed: every way the model's JSON
/// can deviate from it maps to a distinct error.
fn parse_translations(content: &str, expected: usize) -> Result<Vec<String>, TranslationError> {
    let value: Value =
        serde_json::from_str(content).map_err(|err| TranslationError::MalformedReply {
            reason: format!("message content is not valid JSON: {err}"),
        })?;
    let Some(items) = value.get("translations").and_then(Value::as_array) else {
        return Err(TranslationError::MissingTranslations);
    };
    let mut translations = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(TranslationError::NonStringItem { index });
        };
        translations.push(text.to_string());
    }
    if translations.len() != expected {
        return Err(TranslationError::CountMismatch {
            expected,
            got: translations.len(),
        });
    }
    Ok(translations)
}

fn zip_results(batch: &TranslationBatch, translations: Vec<String>) -> Vec<TranslationResult> {
    batch
        .units
        .iter()
        .zip(translations)
        .zip(&batch.paths)
        .map(|((unit, translated), path)| TranslationResult {
            original: unit.value.clone(),
            translated,
            path: path.clone(),
            state: state::TRANSLATED.to_string(),
            error: None,
        })
        .collect()
}

fn base_url() -> String {
    std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

fn extract_error_detail(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
        code: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    let mut parts = Vec::new();
    if let Some(message) = error.message.filter(|value| !value.trim().is_empty()) {
        parts.push(message);
    }
    if let Some(code) = error.code.filter(|value| !value.trim().is_empty()) {
        parts.push(format!("code: {code}"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_content_and_usage_from_a_completion_reply() {
        let payload = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/chat_completion.json"
        ));
        let reply = extract_reply(payload).expect("reply");
        assert_eq!(reply.total_tokens, Some(218));

        let translations = parse_translations(&reply.content, 2).expect("translations");
        assert_eq!(translations, vec!["Hallo %@", "Auf Wiedersehen"]);
    }

    #[test]
    fn reply_without_content_is_malformed() {
        let err = extract_reply(r#"{"choices": []}"#).expect_err("no content");
        assert!(matches!(err, TranslationError::MalformedReply { .. }));
    }

    #[test]
    fn content_that_is_not_json_is_malformed() {
        let err = parse_translations("Sure! Here are the translations:", 1).expect_err("not json");
        assert!(matches!(err, TranslationError::MalformedReply { .. }));
    }

    #[test]
    fn missing_translations_array_is_an_error() {
        let err = parse_translations(r#"{"result": []}"#, 1).expect_err("missing array");
        assert!(matches!(err, TranslationError::MissingTranslations));
    }

    #[test]
    fn short_reply_is_a_count_mismatch_not_a_partial_result() {
        let err = parse_translations(r#"{"translations": ["eins"]}"#, 2).expect_err("mismatch");
        assert!(matches!(
            err,
            TranslationError::CountMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn non_string_item_is_rejected_with_its_index() {
        let err =
            parse_translations(r#"{"translations": ["eins", 2]}"#, 2).expect_err("non-string");
        assert!(matches!(err, TranslationError::NonStringItem { index: 1 }));
    }

    #[test]
    fn usage_accumulates_tokens_and_cost() {
        let mut client = OpenAiClient::new("sk-test", "gpt-4-turbo-preview");
        client.record_usage(1500);
        client.record_usage(500);

        let usage = client.usage();
        assert_eq!(usage.total_tokens, 2000);
        assert!((usage.total_cost_usd - 0.02).abs() < 1e-9);
    }
}
