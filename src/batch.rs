use serde::Serialize;
use std::fmt;

/// One string headed for translation: its source text and the context
/// comment shown to the model. Carries no identity of its own; the parallel
/// `UnitPath` at the same batch index is the only link back to the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationUnit {
    pub value: String,
    pub comment: String,
}

/// Address of a localization slot inside the catalog: entry key, target
/// language, and the variation (if the slot belongs to one).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitPath {
    pub key: String,
    pub lang: String,
    pub variation: Option<VariationRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariationRef {
    pub key: String,
    pub device: String,
}

impl UnitPath {
    pub fn entry(key: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            lang: lang.into(),
            variation: None,
        }
    }

    pub fn variation(
        key: impl Into<String>,
        lang: impl Into<String>,
        variation_key: impl Into<String>,
        device: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            lang: lang.into(),
            variation: Some(VariationRef {
                key: variation_key.into(),
                device: device.into(),
            }),
        }
    }
}

impl fmt::Display for UnitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variation {
            Some(variation) => write!(
                f,
                "{} -> {} [{}/{}]",
                self.key, self.lang, variation.key, variation.device
            ),
            None => write!(f, "{} -> {}", self.key, self.lang),
        }
    }
}

/// An ordered group of units submitted in one request. `units` and `paths`
/// are index-aligned and stay that way through the reply.
#[derive(Debug, Clone)]
pub struct TranslationBatch {
    pub units: Vec<TranslationUnit>,
    pub paths: Vec<UnitPath>,
    pub source_lang: String,
    pub target_lang: String,
    pub chunk_index: usize,
    pub chunk_count: usize,
}

impl TranslationBatch {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Reduced batch holding only the given indices, in order. Retries of
    /// partially failed batches go through here; the original batch is
    /// never resubmitted as-is.
    pub fn narrow(&self, indices: &[usize]) -> Self {
        Self {
            units: indices.iter().map(|&i| self.units[i].clone()).collect(),
            paths: indices.iter().map(|&i| self.paths[i].clone()).collect(),
            source_lang: self.source_lang.clone(),
            target_lang: self.target_lang.clone(),
            chunk_index: self.chunk_index,
            chunk_count: self.chunk_count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranslationResult {
    pub original: String,
    pub translated: String,
    pub path: UnitPath,
    pub state: String,
    pub error: Option<String>,
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Greedy packing under a word budget. The budget is a soft cap: a batch is
/// closed before a unit that would push it over, but a single unit larger
/// than the whole budget still gets a batch of its own. Indices are stamped
/// in a second pass once the total is known.
pub fn chunk_units(
    items: Vec<(TranslationUnit, UnitPath)>,
    words_per_chunk: usize,
    source_lang: &str,
    target_lang: &str,
) -> Vec<TranslationBatch> {
    let mut batches: Vec<TranslationBatch> = Vec::new();
    let mut units = Vec::new();
    let mut paths = Vec::new();
    let mut words = 0usize;

    for (unit, path) in items {
        let unit_words = word_count(&unit.value);
        if !units.is_empty() && words + unit_words > words_per_chunk {
            batches.push(TranslationBatch {
                units: std::mem::take(&mut units),
                paths: std::mem::take(&mut paths),
                source_lang: source_lang.to_string(),
                target_lang: target_lang.to_string(),
                chunk_index: 0,
                chunk_count: 0,
            });
            words = 0;
        }
        words += unit_words;
        units.push(unit);
        paths.push(path);
    }
    if !units.is_empty() {
        batches.push(TranslationBatch {
            units,
            paths,
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            chunk_index: 0,
            chunk_count: 0,
        });
    }

    let total = batches.len();
    for (index, batch) in batches.iter_mut().enumerate() {
        batch.chunk_index = index;
        batch.chunk_count = total;
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(value: &str, key: &str) -> (TranslationUnit, UnitPath) {
        (
            TranslationUnit {
                value: value.to_string(),
                comment: String::new(),
            },
            UnitPath::entry(key, "de"),
        )
    }

    #[test]
    fn chunking_preserves_order_and_coverage() {
        let items = vec![
            item("one two three", "a"),
            item("four five", "b"),
            item("six seven eight nine", "c"),
            item("ten", "d"),
        ];
        let expected: Vec<String> = items.iter().map(|(unit, _)| unit.value.clone()).collect();

        let batches = chunk_units(items, 5, "en", "de");

        let flattened: Vec<String> = batches
            .iter()
            .flat_map(|batch| batch.units.iter().map(|unit| unit.value.clone()))
            .collect();
        assert_eq!(flattened, expected);

        let paths: Vec<&UnitPath> = batches.iter().flat_map(|batch| &batch.paths).collect();
        assert_eq!(paths.len(), 4);
        for batch in &batches {
            assert_eq!(batch.units.len(), batch.paths.len());
        }
    }

    #[test]
    fn chunking_respects_budget_except_for_singletons() {
        let items = vec![
            item("a b c", "a"),
            item("d e f", "b"),
            item("one two three four five six seven eight", "c"),
            item("tail", "d"),
        ];

        let batches = chunk_units(items, 6, "en", "de");

        for batch in &batches {
            let words: usize = batch
                .units
                .iter()
                .map(|unit| unit.value.split_whitespace().count())
                .sum();
            if batch.units.len() > 1 {
                assert!(words <= 6, "multi-unit batch of {words} words over budget");
            }
        }
        // The eight-word unit exceeds the budget alone and still ships.
        assert!(
            batches
                .iter()
                .any(|batch| batch.units.len() == 1 && batch.units[0].value.starts_with("one"))
        );
    }

    #[test]
    fn chunk_indices_are_stamped_after_packing() {
        let items = vec![item("a b c", "a"), item("d e f", "b"), item("g h i", "c")];
        let batches = chunk_units(items, 3, "en", "fr");

        assert_eq!(batches.len(), 3);
        for (expected, batch) in batches.iter().enumerate() {
            assert_eq!(batch.chunk_index, expected);
            assert_eq!(batch.chunk_count, 3);
            assert_eq!(batch.source_lang, "en");
            assert_eq!(batch.target_lang, "fr");
        }
    }

    #[test]
    fn empty_input_produces_no_batches() {
        let batches = chunk_units(Vec::new(), 30, "en", "de");
        assert!(batches.is_empty());
    }

    #[test]
    fn narrow_keeps_selected_slots_aligned() {
        let items = vec![item("a", "a"), item("b", "b"), item("c", "c")];
        let batches = chunk_units(items, 30, "en", "de");
        let narrowed = batches[0].narrow(&[0, 2]);

        assert_eq!(narrowed.len(), 2);
        assert_eq!(narrowed.units[0].value, "a");
        assert_eq!(narrowed.units[1].value, "c");
        assert_eq!(narrowed.paths[1], UnitPath::entry("c", "de"));
        assert_eq!(narrowed.chunk_index, batches[0].chunk_index);
    }
}
