use tracing::warn;

use crate::batch::{TranslationBatch, TranslationResult};
use crate::catalog::state;
use crate::client::{TranslationBackend, TranslationError};

/// What a batch ended up as after retrying: the final index-order results
/// and how many submissions it took.
#[derive(Debug)]
pub struct RetryOutcome {
    pub results: Vec<TranslationResult>,
    pub attempts: usize,
}

/// Submits a batch, retrying on failure up to `max_attempts` submissions.
/// A backend error fails the whole attempt and the full batch is submitted
/// again; once a reply lands, any results left in the error state are
/// resubmitted as a narrowed batch of just those paths, replacing the failed
/// slots in place. Paths still unresolved when attempts run out keep the
/// state their last attempt produced.
pub async fn translate_with_retry<B: TranslationBackend>(
    backend: &mut B,
    batch: &TranslationBatch,
    max_attempts: usize,
) -> Result<RetryOutcome, TranslationError> {
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0usize;

    let mut results = loop {
        attempts += 1;
        match backend.translate_batch(batch).await {
            Ok(results) => break results,
            Err(err) if attempts < max_attempts => {
                warn!(
                    "chunk {}/{} attempt {attempts} failed: {err}; retrying",
                    batch.chunk_index + 1,
                    batch.chunk_count
                );
            }
            Err(err) => return Err(err),
        }
    };

    while attempts < max_attempts {
        let failed: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, result)| result.state == state::ERROR)
            .map(|(index, _)| index)
            .collect();
        if failed.is_empty() {
            break;
        }

        let narrowed = batch.narrow(&failed);
        warn!(
            "chunk {}/{}: resubmitting {} failed strings",
            batch.chunk_index + 1,
            batch.chunk_count,
            narrowed.len()
        );
        attempts += 1;
        match backend.translate_batch(&narrowed).await {
            Ok(retried) if retried.len() == narrowed.len() => {
                for (slot, result) in failed.into_iter().zip(retried) {
                    results[slot] = result;
                }
            }
            Ok(retried) => warn!(
                "narrowed retry returned {} results for {} paths; keeping previous states",
                retried.len(),
                narrowed.len()
            ),
            Err(err) => warn!("narrowed retry attempt {attempts} failed: {err}"),
        }
    }

    Ok(RetryOutcome { results, attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{TranslationUnit, UnitPath, chunk_units};
    use crate::client::BackendFuture;
    use std::collections::{HashSet, VecDeque};

    struct ScriptedBackend {
        replies: VecDeque<Result<Vec<TranslationResult>, TranslationError>>,
        seen_sizes: Vec<usize>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<Vec<TranslationResult>, TranslationError>>) -> Self {
            Self {
                replies: replies.into(),
                seen_sizes: Vec::new(),
            }
        }
    }

    impl TranslationBackend for ScriptedBackend {
        fn translate_batch<'a>(&'a mut self, batch: &'a TranslationBatch) -> BackendFuture<'a> {
            Box::pin(async move {
                self.seen_sizes.push(batch.len());
                self.replies.pop_front().expect("scripted reply")
            })
        }
    }

    fn batch_of(keys: &[&str]) -> TranslationBatch {
        let items = keys
            .iter()
            .map(|key| {
                (
                    TranslationUnit {
                        value: format!("text {key}"),
                        comment: String::new(),
                    },
                    UnitPath::entry(*key, "de"),
                )
            })
            .collect();
        chunk_units(items, 1000, "en", "de").remove(0)
    }

    fn results_for(batch: &TranslationBatch, states: &[&str]) -> Vec<TranslationResult> {
        batch
            .units
            .iter()
            .zip(&batch.paths)
            .zip(states)
            .map(|((unit, path), state)| TranslationResult {
                original: unit.value.clone(),
                translated: format!("übersetzt {}", unit.value),
                path: path.clone(),
                state: state.to_string(),
                error: None,
            })
            .collect()
    }

    fn parity_error() -> TranslationError {
        TranslationError::CountMismatch {
            expected: 3,
            got: 1,
        }
    }

    #[tokio::test]
    async fn full_batch_is_retried_after_a_failed_attempt() {
        let batch = batch_of(&["a", "b", "c"]);
        let ok = results_for(
            &batch,
            &[state::TRANSLATED, state::TRANSLATED, state::TRANSLATED],
        );
        let mut backend = ScriptedBackend::new(vec![Err(parity_error()), Ok(ok)]);

        let outcome = translate_with_retry(&mut backend, &batch, 3)
            .await
            .expect("outcome");

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.results.len(), 3);
        let distinct: HashSet<_> = outcome.results.iter().map(|result| &result.path).collect();
        assert_eq!(distinct.len(), 3);
        assert!(
            outcome
                .results
                .iter()
                .all(|result| result.state == state::TRANSLATED)
        );
        assert_eq!(backend.seen_sizes, vec![3, 3]);
    }

    #[tokio::test]
    async fn exhausted_attempts_propagate_the_last_error() {
        let batch = batch_of(&["a", "b", "c"]);
        let mut backend = ScriptedBackend::new(vec![
            Err(parity_error()),
            Err(parity_error()),
            Err(parity_error()),
        ]);

        let err = translate_with_retry(&mut backend, &batch, 3)
            .await
            .expect_err("exhausted");
        assert!(matches!(err, TranslationError::CountMismatch { .. }));
        assert_eq!(backend.seen_sizes, vec![3, 3, 3]);
    }

    #[tokio::test]
    async fn error_state_results_are_resubmitted_as_a_narrowed_batch() {
        let batch = batch_of(&["a", "b", "c"]);
        let first = results_for(&batch, &[state::TRANSLATED, state::ERROR, state::TRANSLATED]);
        let narrowed = batch.narrow(&[1]);
        let second = results_for(&narrowed, &[state::TRANSLATED]);
        let mut backend = ScriptedBackend::new(vec![Ok(first), Ok(second)]);

        let outcome = translate_with_retry(&mut backend, &batch, 3)
            .await
            .expect("outcome");

        assert_eq!(outcome.attempts, 2);
        assert_eq!(backend.seen_sizes, vec![3, 1]);
        assert!(
            outcome
                .results
                .iter()
                .all(|result| result.state == state::TRANSLATED)
        );
        let distinct: HashSet<_> = outcome.results.iter().map(|result| &result.path).collect();
        assert_eq!(distinct.len(), 3);
        // Order of the full batch is preserved through the splice.
        assert_eq!(outcome.results[1].path, UnitPath::entry("b", "de"));
    }

    #[tokio::test]
    async fn unresolved_paths_keep_their_last_state_when_attempts_run_out() {
        let batch = batch_of(&["a", "b"]);
        let first = results_for(&batch, &[state::TRANSLATED, state::ERROR]);
        let mut backend = ScriptedBackend::new(vec![Ok(first), Err(parity_error())]);

        let outcome = translate_with_retry(&mut backend, &batch, 2)
            .await
            .expect("outcome");

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.results[0].state, state::TRANSLATED);
        assert_eq!(outcome.results[1].state, state::ERROR);
    }
}
