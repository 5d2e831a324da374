use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

use crate::batch::{TranslationBatch, TranslationResult};

mod backoff;
mod openai;
pub mod prompt;

pub use openai::OpenAiClient;

/// Everything that can go wrong between submitting a batch and holding its
/// parsed translations. A count mismatch is unrecoverable ambiguity: the
/// protocol round-trips no per-unit id, so a short reply cannot be matched
/// back to its units.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion endpoint returned {status}: {detail}")]
    Endpoint {
        status: reqwest::StatusCode,
        detail: String,
    },
    #[error("failed to build translation prompt: {0}")]
    Prompt(anyhow::Error),
    #[error("completion reply is not usable: {reason}")]
    MalformedReply { reason: String },
    #[error("completion reply has no \"translations\" array")]
    MissingTranslations,
    #[error("completion reply item {index} is not a string")]
    NonStringItem { index: usize },
    #[error("expected {expected} translations, got {got}")]
    CountMismatch { expected: usize, got: usize },
}

/// Token usage and derived cost accumulated by a client over its lifetime.
/// Owned by the client value and read with `usage()`, not process-global,
/// so batches could run in parallel sessions later.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageStats {
    pub total_tokens: u64,
    pub total_cost_usd: f64,
}

pub type BackendFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<TranslationResult>, TranslationError>> + Send + 'a>>;

/// The seam between the pipeline and the completion endpoint. The retry
/// controller and the run loop only ever talk to this trait, which keeps
/// them drivable by a scripted backend in tests.
pub trait TranslationBackend {
    fn translate_batch<'a>(&'a mut self, batch: &'a TranslationBatch) -> BackendFuture<'a>;
}
