//! Seed candidate selection from a frequency store.
//!
//! Reads the top-N rows by rank, filters by stopwords and (optionally) by
//! dictionary membership, assigns a POS-bucket admission weight and sorts
//! the survivors. Output is deterministic for a given database, dictionary
//! and stopword set.

use crate::error::{CoreError, Result};
use crate::frequency::{pmw_weight, rank_weight, FrequencyStore};
use crate::rules::WordPackage;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Coarse POS bucket used for admission weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PosBucket {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Other,
}

impl PosBucket {
    /// Map a raw provider POS tag into a bucket. Tag conventions differ per
    /// provider; prefix matching covers the common abbreviation families.
    pub fn from_raw_tag(raw: &str) -> Self {
        let tag = raw.trim().to_lowercase();
        if tag.is_empty() {
            return PosBucket::Other;
        }
        if tag.starts_with("adj") || tag.starts_with("形容") {
            PosBucket::Adjective
        } else if tag.starts_with("adv") || tag.starts_with("副") {
            PosBucket::Adverb
        } else if tag.starts_with('n') || tag.starts_with("名") {
            PosBucket::Noun
        } else if tag.starts_with('v') || tag.starts_with("動") {
            PosBucket::Verb
        } else {
            PosBucket::Other
        }
    }

    /// Fixed admission weight per bucket. Nouns carry the most signal for
    /// in-context substitution; adverbs and function words the least.
    pub fn weight(self) -> f64 {
        match self {
            PosBucket::Noun => 1.0,
            PosBucket::Adjective => 0.85,
            PosBucket::Verb => 0.70,
            PosBucket::Adverb => 0.55,
            PosBucket::Other => 0.40,
        }
    }
}

/// Dictionary membership and word-package source for seed filtering.
///
/// Implemented by the JMDict index in the rulegen crate; kept as a trait so
/// the selector has no dictionary-format dependency.
pub trait LemmaProvider {
    fn contains(&self, lemma: &str) -> bool;
    fn word_package(&self, lemma: &str, language_tag: &str) -> Option<WordPackage>;
}

/// Selector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub pair: String,
    /// Language tag of the lemmas (second segment of the pair).
    pub language_tag: String,
    /// How many rows to read from the top of the frequency table.
    pub top_n: usize,
    /// Reject lemmas absent from the dictionary provider.
    pub require_dictionary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
}

impl SelectorConfig {
    pub fn new<P: Into<String>, L: Into<String>>(pair: P, language_tag: L, top_n: usize) -> Self {
        Self {
            pair: pair.into(),
            language_tag: language_tag.into(),
            top_n,
            require_dictionary: false,
            provider_name: None,
        }
    }
}

/// A ranked admission candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedWord {
    pub lemma: String,
    pub pair: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_package: Option<WordPackage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_rank: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    pub pos_bucket: PosBucket,
    pub pos_weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmw: Option<f64>,
    pub base_weight: f64,
    pub admission_weight: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

/// Load a stopword file: a JSON array of strings. Any other shape is an
/// error.
pub fn load_stopwords<P: AsRef<Path>>(path: P) -> Result<AHashSet<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CoreError::missing(path));
    }
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| CoreError::malformed(path, format!("invalid JSON: {}", e)))?;
    let Value::Array(items) = value else {
        return Err(CoreError::malformed(path, "stopwords must be a JSON array"));
    };
    let mut out = AHashSet::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => {
                out.insert(s);
            }
            other => {
                return Err(CoreError::malformed(
                    path,
                    format!("stopword entries must be strings, got {}", other),
                ));
            }
        }
    }
    Ok(out)
}

/// Build ranked seed candidates from a frequency store.
pub fn build_seed_candidates(
    store: &FrequencyStore,
    config: &SelectorConfig,
    stopwords: &AHashSet<String>,
    dictionary: Option<&dyn LemmaProvider>,
) -> Result<Vec<SeedWord>> {
    let cols = store.resolve_standard_columns()?;
    let rows = store.iter_top_by_rank(config.top_n, &cols)?;

    let max_pmw = match &cols.pmw {
        Some(c) => store.max_value(c)?.unwrap_or(0.0),
        None => 0.0,
    };
    let max_rank = match &cols.rank {
        Some(c) => store.max_value(c)?.unwrap_or(0.0) as i64,
        None => 0,
    };

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let lemma = row.lemma.trim().to_string();
        if lemma.is_empty() || stopwords.contains(&lemma) {
            continue;
        }
        if config.require_dictionary {
            match dictionary {
                Some(d) if d.contains(&lemma) => {}
                _ => continue,
            }
        }

        let pos_bucket = row
            .pos
            .as_deref()
            .map(PosBucket::from_raw_tag)
            .unwrap_or(PosBucket::Other);
        let pos_weight = pos_bucket.weight();

        // PMW drives the base weight; rank-only packs degrade to the
        // linear rank fallback.
        let base_weight = match row.pmw {
            Some(pmw) if max_pmw > 0.0 => pmw_weight(pmw, max_pmw),
            _ => row
                .core_rank
                .map(|r| rank_weight(r, max_rank))
                .unwrap_or(0.0),
        };
        let admission_weight = base_weight * pos_weight;

        let word_package = dictionary
            .and_then(|d| d.word_package(&lemma, &config.language_tag))
            .map(|mut pkg| {
                pkg.pos = pkg.pos.or_else(|| row.pos.clone());
                pkg.frequency_rank = pkg.frequency_rank.or(row.core_rank);
                pkg.provider = pkg.provider.or_else(|| config.provider_name.clone());
                pkg
            });

        let mut metadata = BTreeMap::new();
        if let Some(p) = &config.provider_name {
            metadata.insert("provider".to_string(), Value::String(p.clone()));
        }
        if let Some(lform) = row.lform {
            metadata.insert("lform".to_string(), Value::String(lform));
        }
        if let Some(wtype) = row.wtype {
            metadata.insert("wtype".to_string(), Value::String(wtype));
        }
        if let Some(sublemma) = row.sublemma {
            metadata.insert("sublemma".to_string(), Value::String(sublemma));
        }

        out.push(SeedWord {
            lemma,
            pair: config.pair.clone(),
            word_package,
            core_rank: row.core_rank,
            pos: row.pos,
            pos_bucket,
            pos_weight,
            pmw: row.pmw,
            base_weight,
            admission_weight,
            metadata,
        });
    }

    out.sort_by(|a, b| {
        b.admission_weight
            .partial_cmp(&a.admission_weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.base_weight
                    .partial_cmp(&a.base_weight)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(
                a.core_rank
                    .unwrap_or(i64::MAX)
                    .cmp(&b.core_rank.unwrap_or(i64::MAX)),
            )
            .then(a.lemma.cmp(&b.lemma))
    });

    info!(
        pair = %config.pair,
        candidates = out.len(),
        "built seed candidates"
    );
    Ok(out)
}
