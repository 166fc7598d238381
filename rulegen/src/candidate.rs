//! Intermediate rule candidates flowing through the generation pipeline.

use lexishift_core::ScriptForms;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One candidate substitution before filtering, scoring and emission.
///
/// `source_phrase` is the text that will be matched in the reader's
/// language; `replacement` is the target-language surface that will be
/// inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCandidate {
    pub source_phrase: String,
    pub replacement: String,
    pub language_pair: String,
    /// Dictionary the candidate came from ("jmdict", "freedict-deu-eng", ...).
    pub source_dict: String,
    /// Coarse provenance kind, copied onto the emitted rule's tags.
    pub source_type: String,
    /// Position of the gloss within its entry; earlier glosses are the more
    /// common senses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gloss_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gloss_total: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_forms: Option<ScriptForms>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    /// Normalized frequency weight of the replacement lemma, when a
    /// frequency pack was available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_weight: Option<f64>,
    /// Cosine-style relatedness in [0, 1] from an embedding pack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_similarity: Option<f64>,
    /// "inflected" when produced by a variant expander.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl RuleCandidate {
    pub fn new<S, R, P, D, T>(
        source_phrase: S,
        replacement: R,
        language_pair: P,
        source_dict: D,
        source_type: T,
    ) -> Self
    where
        S: Into<String>,
        R: Into<String>,
        P: Into<String>,
        D: Into<String>,
        T: Into<String>,
    {
        Self {
            source_phrase: source_phrase.into(),
            replacement: replacement.into(),
            language_pair: language_pair.into(),
            source_dict: source_dict.into(),
            source_type: source_type.into(),
            gloss_index: None,
            gloss_total: None,
            script_forms: None,
            pos: None,
            frequency_weight: None,
            embedding_similarity: None,
            variant: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Dedupe key: case-insensitive source and replacement within a pair.
    pub fn dedupe_key(&self) -> (String, String, String) {
        (
            self.source_phrase.to_lowercase(),
            self.replacement.to_lowercase(),
            self.language_pair.clone(),
        )
    }

    pub fn is_multiword(&self) -> bool {
        self.source_phrase.split_whitespace().count() > 1
    }
}
