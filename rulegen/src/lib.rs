//! lexishift-rulegen: dictionary loaders and rule generation.
//!
//! Modules:
//! - `error`: generation error type wrapping core and XML failures
//! - `candidate`: intermediate candidates flowing through the pipeline
//! - `jmdict`: streaming JMDict loader and lemma provider
//! - `freedict`: streaming FreeDict TEI loader
//! - `romaji`: kana to romaji transliteration
//! - `filters`: gloss acceptance rules and artifact removal
//! - `score`: candidate confidence scoring
//! - `expand`: inflected-variant expanders
//! - `pipeline`: staged source → normalize → filter → expand → score run
//! - `adapters`: per-pair pipeline assembly and dispatch

pub mod adapters;
pub mod candidate;
pub mod error;
pub mod expand;
pub mod filters;
pub mod freedict;
pub mod jmdict;
pub mod pipeline;
pub mod romaji;
pub mod score;

pub use adapters::{pair_supported, run_rulegen, RulegenRequest, SUPPORTED_PAIRS};
pub use candidate::RuleCandidate;
pub use error::{Result, RulegenError};
pub use filters::{GlossFilterConfig, GlossLanguage};
pub use freedict::{FreeDictEntry, FreeDictIndex};
pub use jmdict::{JmdictEntry, JmdictIndex};
pub use pipeline::{
    CandidateExpander, CandidateNormalizer, CandidateSource, GenerationOutcome, GenerationStats,
    RuleGenerationConfig, RuleGenerationPipeline,
};
pub use romaji::kana_to_romaji;
pub use score::score_candidate;
