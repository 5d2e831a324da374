use tracing::debug;

use crate::batch::{TranslationUnit, UnitPath};
use crate::catalog::{Localization, StringCatalog, StringUnit, state};

/// Collects every (unit, path) pair that still needs a target-language
/// translation. An entry or variation with no source-language localization
/// first gets one synthesized from the entry key, written into the catalog
/// as part of the walk; the caller persists the document afterwards so the
/// synthesis survives re-runs. Absence of the target-language key is the
/// needs-translation signal; an existing localization is left alone whatever
/// its state.
pub fn extract_units(
    catalog: &mut StringCatalog,
    source_lang: &str,
    target_lang: &str,
) -> Vec<(TranslationUnit, UnitPath)> {
    debug!("looking for strings to translate from {source_lang} to {target_lang}");
    let mut items = Vec::new();

    for (key, entry) in catalog.strings.iter_mut() {
        let comment = entry.extraction_state.clone().unwrap_or_default();

        let synthesized = !entry.localizations.contains_key(source_lang);
        if synthesized {
            entry.localizations.insert(
                source_lang.to_string(),
                synthesized_source(key),
            );
        }
        let source_value = entry.localizations[source_lang]
            .string_unit
            .as_ref()
            .map(|unit| unit.value.clone());
        match source_value {
            Some(value) => {
                if !entry.localizations.contains_key(target_lang) {
                    debug!("adding {key} for translation");
                    items.push((
                        TranslationUnit {
                            value,
                            comment: comment.clone(),
                        },
                        UnitPath::entry(key.clone(), target_lang),
                    ));
                }
            }
            // A pre-existing source localization without a string unit has
            // nothing to translate from.
            None => debug!("skipping {key}: source has no string unit"),
        }

        for (var_key, variation) in entry.variations.iter_mut() {
            let device = variation.device.clone().unwrap_or_default();
            if !variation.localizations.contains_key(source_lang) {
                variation.localizations.insert(
                    source_lang.to_string(),
                    synthesized_source(key),
                );
            }
            let Some(unit) = variation.localizations[source_lang].string_unit.as_ref() else {
                debug!("skipping variation {var_key} of {key}: source has no string unit");
                continue;
            };
            if variation.localizations.contains_key(target_lang) {
                continue;
            }
            debug!("adding variation {var_key} of {key} for translation");
            items.push((
                TranslationUnit {
                    value: unit.value.clone(),
                    comment: format!("{comment} [Variation for {device}]"),
                },
                UnitPath::variation(key.clone(), target_lang, var_key.clone(), device),
            ));
        }
    }

    debug!("found {} strings to translate", items.len());
    items
}

fn synthesized_source(key: &str) -> Localization {
    Localization {
        string_unit: Some(StringUnit::new(key, state::TRANSLATED)),
        extra: serde_json::Map::new(),
    }
}
