//! lexishift-core: language-agnostic substitution and learning engine.
//!
//! Modules:
//! - `error`: shared error type and result alias
//! - `token`: lossless word/space/punct tokenizer and normalizer traits
//! - `rules`: vocabulary rule model, datasets and settings
//! - `trie`: phrase trie keyed by normalized word paths
//! - `replacer`: compiled rule pool and longest-match text replacement
//! - `inflect`: English inflection engine and phrase expansion
//! - `frequency`: read-only frequency lexicon over SQLite
//! - `seed`: part-of-speech weighted seed candidate selection
//! - `srs`: spaced-repetition store, scheduler, signals, admission, planner
//! - `persist`: canonical JSON persistence, profiles and platform layout

pub mod error;
pub mod frequency;
pub mod inflect;
pub mod persist;
pub mod replacer;
pub mod rules;
pub mod seed;
pub mod srs;
pub mod token;
pub mod trie;

pub use error::{CoreError, Result};
pub use frequency::{pmw_weight, rank_weight, FrequencyRow, FrequencyStore};
pub use inflect::{ApplyTo, ExpansionSpec, InflectionEngine, InflectionForm};
pub use persist::{AppSettings, HelperStatus, Profile, ProfilePaths};
pub use replacer::{Match, Replacer, Span, VocabPool};
pub use rules::{
    CasePolicy, MeaningRule, ScriptForms, VocabDataset, VocabRule, VocabSettings, WordPackage,
};
pub use seed::{build_seed_candidates, LemmaProvider, PosBucket, SeedWord, SelectorConfig};
pub use token::{tokenize, LowercaseNormalizer, SynonymNormalizer, Token, TokenKind, WordNormalizer};
pub use trie::PhraseTrie;
