use std::fmt;

use crate::batch::{TranslationBatch, TranslationResult, UnitPath};
use crate::catalog::state;

/// Run-wide tally of batch outcomes. Pure bookkeeping: the run loop feeds it
/// after every batch and reads the summary at the end; it never influences
/// control flow.
#[derive(Debug, Default)]
pub struct Progress {
    total_chunks: usize,
    completed_chunks: usize,
    total_strings: usize,
    completed_strings: usize,
    failed: Vec<UnitPath>,
}

impl Progress {
    pub fn new(total_chunks: usize, total_strings: usize) -> Self {
        Self {
            total_chunks,
            total_strings,
            ..Self::default()
        }
    }

    pub fn record_results(&mut self, results: &[TranslationResult]) {
        self.completed_chunks += 1;
        for result in results {
            if result.state == state::ERROR {
                self.failed.push(result.path.clone());
            } else {
                self.completed_strings += 1;
            }
        }
    }

    /// A batch that exhausted its retries produced no results at all; every
    /// path it carried counts as failed.
    pub fn record_failed_batch(&mut self, batch: &TranslationBatch) {
        self.completed_chunks += 1;
        self.failed.extend(batch.paths.iter().cloned());
    }

    pub fn summary(&self) -> ProgressSummary<'_> {
        ProgressSummary { progress: self }
    }
}

pub struct ProgressSummary<'a> {
    progress: &'a Progress,
}

impl fmt::Display for ProgressSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let progress = self.progress;
        write!(
            f,
            "chunks {}/{}, strings {}/{}",
            progress.completed_chunks,
            progress.total_chunks,
            progress.completed_strings,
            progress.total_strings
        )?;
        if !progress.failed.is_empty() {
            write!(f, ", {} failed:", progress.failed.len())?;
            for path in &progress.failed {
                write!(f, "\n  {path}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{TranslationUnit, chunk_units};

    fn result(key: &str, state: &str) -> TranslationResult {
        TranslationResult {
            original: "Hello".to_string(),
            translated: "Hallo".to_string(),
            path: UnitPath::entry(key, "de"),
            state: state.to_string(),
            error: None,
        }
    }

    #[test]
    fn counts_only_non_error_results_as_completed() {
        let mut progress = Progress::new(2, 3);
        progress.record_results(&[
            result("a", state::TRANSLATED),
            result("b", state::ERROR),
            result("c", state::TRANSLATED),
        ]);

        let text = progress.summary().to_string();
        assert!(text.starts_with("chunks 1/2, strings 2/3, 1 failed:"));
        assert!(text.contains("b -> de"));
    }

    #[test]
    fn failed_batch_marks_every_path() {
        let items = vec![
            (
                TranslationUnit {
                    value: "Hello".to_string(),
                    comment: String::new(),
                },
                UnitPath::entry("a", "de"),
            ),
            (
                TranslationUnit {
                    value: "Bye".to_string(),
                    comment: String::new(),
                },
                UnitPath::entry("b", "de"),
            ),
        ];
        let batches = chunk_units(items, 30, "en", "de");

        let mut progress = Progress::new(1, 2);
        progress.record_failed_batch(&batches[0]);

        let text = progress.summary().to_string();
        assert!(text.contains("chunks 1/1, strings 0/2, 2 failed:"));
    }

    #[test]
    fn clean_run_has_no_failure_section() {
        let mut progress = Progress::new(1, 1);
        progress.record_results(&[result("a", state::TRANSLATED)]);
        assert_eq!(progress.summary().to_string(), "chunks 1/1, strings 1/1");
    }
}
