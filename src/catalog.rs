use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::batch::TranslationResult;

/// String-unit states used by `.xcstrings` catalogs. `ERROR` marks retry
/// candidates in flight and must never survive into a saved catalog.
pub mod state {
    pub const NEW: &str = "new";
    pub const TRANSLATED: &str = "translated";
    pub const NEEDS_REVIEW: &str = "needs_review";
    pub const ERROR: &str = "error";
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog file {path} has no top-level \"strings\" table")]
    MissingStrings { path: PathBuf },
    #[error("failed to serialize catalog: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write catalog file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// In-memory form of an `.xcstrings` document. Fields the pipeline does not
/// interpret (`sourceLanguage`, `version`, per-entry `comment`, plural
/// `variations` nested inside a localization) ride along in the flattened
/// extras so a load/save round trip preserves them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StringCatalog {
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
    pub strings: BTreeMap<String, CatalogEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_state: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub localizations: BTreeMap<String, Localization>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variations: BTreeMap<String, Variation>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Localization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_unit: Option<StringUnit>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StringUnit {
    pub state: String,
    pub value: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Variation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub localizations: BTreeMap<String, Localization>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl StringUnit {
    pub fn new(value: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            value: value.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// A catalog bound to the file it was loaded from. Saves happen after every
/// translated batch, so the serialization must stay diff-friendly: 2-space
/// pretty printing, non-ASCII characters literal, keys in sorted order.
#[derive(Debug, Clone)]
pub struct CatalogFile {
    path: PathBuf,
    pub catalog: StringCatalog,
}

impl CatalogFile {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let has_strings = value
            .as_object()
            .map(|root| root.get("strings").is_some_and(Value::is_object))
            .unwrap_or(false);
        if !has_strings {
            return Err(CatalogError::MissingStrings {
                path: path.to_path_buf(),
            });
        }
        let catalog = serde_json::from_value(value).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            catalog,
        })
    }

    pub fn save(&self) -> Result<(), CatalogError> {
        let text = serde_json::to_string_pretty(&self.catalog).map_err(CatalogError::Serialize)?;
        fs::write(&self.path, text).map_err(|source| CatalogError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Writes translation results back into the catalog by path. Results in the
/// error state are skipped, as are paths whose entry or variation no longer
/// exists in the document.
pub fn apply_translations(catalog: &mut StringCatalog, results: &[TranslationResult]) {
    for result in results {
        if result.state == state::ERROR {
            continue;
        }
        let Some(entry) = catalog.strings.get_mut(&result.path.key) else {
            continue;
        };
        let localizations = match &result.path.variation {
            Some(variation) => {
                let Some(variation) = entry.variations.get_mut(&variation.key) else {
                    continue;
                };
                &mut variation.localizations
            }
            None => &mut entry.localizations,
        };
        let target = localizations.entry(result.path.lang.clone()).or_default();
        target.string_unit = Some(StringUnit::new(&result.translated, &result.state));
    }
}
