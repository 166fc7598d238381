//! Per-pair pipeline assembly.
//!
//! A pair names the reader's language first and the learning target second:
//! "en-ja" substitutes Japanese vocabulary into English text. Each
//! supported pair binds a dictionary format, a gloss alphabet and a variant
//! expander; `run_rulegen` validates the inputs and runs the assembled
//! pipeline.

use crate::candidate::RuleCandidate;
use crate::error::Result;
use crate::expand::{EnglishInflectionExpander, SpanishPluralExpander};
use crate::filters::{GlossFilterConfig, GlossLanguage};
use crate::freedict::FreeDictIndex;
use crate::jmdict::JmdictIndex;
use crate::pipeline::{
    CandidateSource, GenerationOutcome, RuleGenerationConfig, RuleGenerationPipeline,
};
use lexishift_core::frequency::ResolvedColumns;
use lexishift_core::seed::load_stopwords;
use lexishift_core::{pmw_weight, CoreError, FrequencyStore};
use std::path::PathBuf;
use tracing::warn;

pub const SUPPORTED_PAIRS: &[&str] = &["en-ja", "en-de", "de-en", "en-es", "es-en"];

pub fn pair_supported(pair: &str) -> bool {
    SUPPORTED_PAIRS.contains(&pair)
}

/// Inputs for one generation run.
#[derive(Debug, Clone)]
pub struct RulegenRequest {
    pub pair: String,
    pub dictionary: PathBuf,
    pub frequency_db: Option<PathBuf>,
    pub stopwords: Option<PathBuf>,
    pub config: RuleGenerationConfig,
    pub allow_multiword: bool,
}

impl RulegenRequest {
    pub fn new<P: Into<String>, D: Into<PathBuf>>(pair: P, dictionary: D) -> Self {
        let pair = pair.into();
        Self {
            config: RuleGenerationConfig::new(pair.clone()),
            pair,
            dictionary: dictionary.into(),
            frequency_db: None,
            stopwords: None,
            allow_multiword: false,
        }
    }
}

struct FreqLookup {
    store: FrequencyStore,
    columns: ResolvedColumns,
    max_pmw: f64,
}

impl FreqLookup {
    fn open(path: &PathBuf) -> Result<Self> {
        let store = FrequencyStore::open(path, None)?;
        let columns = store.resolve_standard_columns()?;
        let max_pmw = match &columns.pmw {
            Some(col) => store.max_value(col)?.unwrap_or(0.0),
            None => 0.0,
        };
        Ok(Self {
            store,
            columns,
            max_pmw,
        })
    }

    fn weight(&self, lemma: &str) -> Option<f64> {
        let col = self.columns.pmw.as_ref()?;
        if self.max_pmw <= 0.0 {
            return None;
        }
        let value = self.store.get_value(lemma, col).ok()??;
        Some(pmw_weight(value, self.max_pmw))
    }
}

/// JMDict-backed source: one candidate per English gloss, replacement in
/// romaji so it reads inline in Latin text.
struct JmdictSource<'a> {
    index: &'a JmdictIndex,
    pair: &'a str,
    freq: Option<&'a FreqLookup>,
}

impl CandidateSource for JmdictSource<'_> {
    fn name(&self) -> &str {
        "jmdict"
    }

    fn candidates(&self) -> Result<Vec<RuleCandidate>> {
        let mut out = Vec::new();
        for entry in self.index.entries() {
            let forms = JmdictIndex::script_forms(entry);
            let romaji = match &forms.romaji {
                Some(r) if !r.is_empty() => r.clone(),
                _ => continue,
            };
            let frequency_weight = self.freq.and_then(|f| f.weight(&entry.term));
            let total = entry.glosses.len();
            for (idx, gloss) in entry.glosses.iter().enumerate() {
                let mut candidate = RuleCandidate::new(
                    gloss.clone(),
                    romaji.clone(),
                    self.pair,
                    "jmdict",
                    "dictionary",
                );
                candidate.gloss_index = Some(idx);
                candidate.gloss_total = Some(total);
                candidate.script_forms = Some(forms.clone());
                candidate.pos = entry.pos.clone();
                candidate.frequency_weight = frequency_weight;
                out.push(candidate);
            }
        }
        Ok(out)
    }
}

/// FreeDict-backed source: translations become source phrases, the
/// headword becomes the replacement.
struct FreeDictSource<'a> {
    index: &'a FreeDictIndex,
    pair: &'a str,
    dict_name: &'a str,
    freq: Option<&'a FreqLookup>,
}

impl CandidateSource for FreeDictSource<'_> {
    fn name(&self) -> &str {
        self.dict_name
    }

    fn candidates(&self) -> Result<Vec<RuleCandidate>> {
        let mut out = Vec::new();
        for entry in self.index.entries() {
            let frequency_weight = self.freq.and_then(|f| f.weight(&entry.headword));
            let total = entry.translations.len();
            for (idx, translation) in entry.translations.iter().enumerate() {
                let mut candidate = RuleCandidate::new(
                    translation.clone(),
                    entry.headword.clone(),
                    self.pair,
                    self.dict_name,
                    "dictionary",
                );
                candidate.gloss_index = Some(idx);
                candidate.gloss_total = Some(total);
                candidate.pos = entry.pos.clone();
                candidate.frequency_weight = frequency_weight;
                out.push(candidate);
            }
        }
        Ok(out)
    }
}

fn gloss_language(pair: &str) -> GlossLanguage {
    // the source phrases are in the reader's language
    match pair.split('-').next() {
        Some("es") => GlossLanguage::Spanish,
        Some("de") => GlossLanguage::German,
        _ => GlossLanguage::English,
    }
}

fn build_pipeline(request: &RulegenRequest) -> Result<RuleGenerationPipeline> {
    let mut filter = GlossFilterConfig {
        language: gloss_language(&request.pair),
        allow_multiword: request.allow_multiword,
        ..GlossFilterConfig::default()
    };
    if let Some(path) = &request.stopwords {
        filter.stopwords = load_stopwords(path)?;
    }

    let mut pipeline = RuleGenerationPipeline::new(request.config.clone(), filter);
    pipeline = match request.pair.split('-').next() {
        Some("en") => pipeline.with_expander(Box::new(EnglishInflectionExpander::default())),
        Some("es") => pipeline.with_expander(Box::new(SpanishPluralExpander)),
        _ => pipeline,
    };
    Ok(pipeline)
}

/// Run rule generation for one pair. Unsupported pairs fail with
/// `pair_unsupported` rather than silently emitting nothing.
pub fn run_rulegen(request: &RulegenRequest) -> Result<GenerationOutcome> {
    if !pair_supported(&request.pair) {
        return Err(CoreError::PairUnsupported(request.pair.clone()).into());
    }
    let freq = match &request.frequency_db {
        Some(path) => match FreqLookup::open(path) {
            Ok(lookup) => Some(lookup),
            Err(e) => {
                warn!(error = %e, "frequency pack unavailable, scoring without it");
                None
            }
        },
        None => None,
    };

    let pipeline = build_pipeline(request)?;
    match request.pair.as_str() {
        "en-ja" => {
            let index = JmdictIndex::load(&request.dictionary)?;
            let source = JmdictSource {
                index: &index,
                pair: &request.pair,
                freq: freq.as_ref(),
            };
            pipeline.run(&[&source])
        }
        _ => {
            // translation quotes are in the reader's language
            let trans_lang = request.pair.split('-').next().unwrap_or("en");
            let index = FreeDictIndex::load(&request.dictionary, trans_lang)?;
            let dict_name = match request.pair.as_str() {
                "en-de" => "freedict-deu-eng",
                "de-en" => "freedict-eng-deu",
                "en-es" => "freedict-spa-eng",
                _ => "freedict-eng-spa",
            };
            let source = FreeDictSource {
                index: &index,
                pair: &request.pair,
                dict_name,
                freq: freq.as_ref(),
            };
            pipeline.run(&[&source])
        }
    }
}
