use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::catalog::StringCatalog;

static C_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%[diouxXfeEgGcrs]").expect("c-style specifier pattern"));
static OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%@").expect("object pattern"));
static POSITIONAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\d+\$[@diouxXfeEgGcrs]").expect("positional pattern"));

/// Outcome of one mechanical check: valid when no violations were recorded.
/// All checks here are advisory; callers report the errors and move on.
#[derive(Debug, Default, Clone)]
pub struct ValidationReport {
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

fn find_all(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .find_iter(text)
        .map(|found| found.as_str().to_string())
        .collect()
}

/// Checks that a translation preserved the source's format specifiers:
/// C-style (`%d`, `%s`, ...), Objective-C object (`%@`), and positional
/// (`%1$@`, `%2$d`, ...). Multisets must match; order may differ.
pub fn check_translation(source: &str, translated: &str) -> ValidationReport {
    let mut report = ValidationReport::default();

    if translated.is_empty() {
        report.push("translation is empty");
        return report;
    }

    let mut source_formats = find_all(&C_STYLE, source);
    let mut translated_formats = find_all(&C_STYLE, translated);
    source_formats.sort();
    translated_formats.sort();
    if source_formats != translated_formats {
        report.push(format!(
            "format specifiers don't match: source has {source_formats:?}, translation has {translated_formats:?}"
        ));
    }

    let source_objects = OBJECT.find_iter(source).count();
    let translated_objects = OBJECT.find_iter(translated).count();
    if source_objects != translated_objects {
        report.push(format!(
            "mismatch in object placeholders: source has {source_objects} %@, translation has {translated_objects}"
        ));
    }

    let mut source_positional = find_all(&POSITIONAL, source);
    let mut translated_positional = find_all(&POSITIONAL, translated);
    source_positional.sort();
    translated_positional.sort();
    if source_positional != translated_positional {
        report.push(format!(
            "positional specifiers don't match: source has {source_positional:?}, translation has {translated_positional:?}"
        ));
    }

    report
}

/// Checks that every key, language, and variation present in the source
/// catalog is still present in the translated catalog. Presence only;
/// values are expected to differ.
pub fn check_structure_preserved(
    source: &StringCatalog,
    translated: &StringCatalog,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (key, source_entry) in &source.strings {
        let Some(translated_entry) = translated.strings.get(key) else {
            report.push(format!("missing string key '{key}' in translation"));
            continue;
        };

        for lang in source_entry.localizations.keys() {
            if !translated_entry.localizations.contains_key(lang) {
                report.push(format!(
                    "missing language '{lang}' for string '{key}' in translation"
                ));
            }
        }

        for (var_key, source_variation) in &source_entry.variations {
            let Some(translated_variation) = translated_entry.variations.get(var_key) else {
                report.push(format!(
                    "missing variation '{var_key}' for string '{key}' in translation"
                ));
                continue;
            };
            for lang in source_variation.localizations.keys() {
                if !translated_variation.localizations.contains_key(lang) {
                    report.push(format!(
                        "missing language '{lang}' in variation '{var_key}' for string '{key}' in translation"
                    ));
                }
            }
        }
    }

    report
}

/// Sanity-checks a raw document against the expected `.xcstrings` shape.
/// Works on the untyped JSON so it can vet both freshly loaded and freshly
/// written documents, including the plural `variations` some catalogs nest
/// inside a localization.
pub fn check_catalog_schema(data: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(root) = data.as_object() else {
        report.push("root must be a mapping");
        return report;
    };
    let Some(strings) = root.get("strings") else {
        report.push("missing required 'strings' key");
        return report;
    };
    let Some(strings) = strings.as_object() else {
        report.push("'strings' must be a mapping");
        return report;
    };

    for (key, entry) in strings {
        let Some(entry) = entry.as_object() else {
            report.push(format!("string entry '{key}' must be a mapping"));
            continue;
        };
        let Some(localizations) = entry.get("localizations") else {
            continue;
        };
        let Some(localizations) = localizations.as_object() else {
            report.push(format!(
                "'localizations' in string entry '{key}' must be a mapping"
            ));
            continue;
        };

        for (lang, localization) in localizations {
            let Some(localization) = localization.as_object() else {
                report.push(format!(
                    "localization '{lang}' in string '{key}' must be a mapping"
                ));
                continue;
            };

            if let Some(unit) = localization.get("stringUnit") {
                check_string_unit(unit, &mut report, || {
                    format!("string '{key}', language '{lang}'")
                });
            }

            if let Some(variations) = localization.get("variations") {
                let Some(variations) = variations.as_object() else {
                    report.push(format!(
                        "'variations' in string '{key}', language '{lang}' must be a mapping"
                    ));
                    continue;
                };
                for (var_key, var_data) in variations {
                    let Some(var_data) = var_data.as_object() else {
                        report.push(format!(
                            "variation '{var_key}' in string '{key}', language '{lang}' must be a mapping"
                        ));
                        continue;
                    };
                    match var_data.get("stringUnit") {
                        Some(unit) => check_string_unit(unit, &mut report, || {
                            format!("variation '{var_key}' in string '{key}', language '{lang}'")
                        }),
                        None => report.push(format!(
                            "missing required 'stringUnit' in variation '{var_key}' for string '{key}', language '{lang}'"
                        )),
                    }
                }
            }
        }
    }

    report
}

fn check_string_unit(unit: &Value, report: &mut ValidationReport, context: impl Fn() -> String) {
    match unit.as_object() {
        Some(unit) => {
            if !unit.contains_key("value") {
                report.push(format!(
                    "missing required 'value' in stringUnit for {}",
                    context()
                ));
            }
        }
        None => report.push(format!("'stringUnit' for {} must be a mapping", context())),
    }
}
