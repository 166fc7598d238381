//! Gloss filters: decide which dictionary glosses are usable as matchable
//! source phrases.
//!
//! Dictionary glosses are written for humans and contain parenthetical
//! hints, idioms, possessives and inflected duplicates. The filters keep
//! only plain words (or short phrases when multiword matching is on) in the
//! alphabet of the source language.

use crate::candidate::RuleCandidate;
use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;
use regex::Regex;

static ENGLISH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z](?:[a-z' \-]*[a-z])?$").unwrap());

static SPANISH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-záéíóúüñ](?:[a-záéíóúüñ' \-]*[a-záéíóúüñ])?$").unwrap());

static GERMAN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zäöüß](?:[a-zäöüß' \-]*[a-zäöüß])?$").unwrap());

/// Alphabet of the source phrases being filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlossLanguage {
    English,
    Spanish,
    German,
}

impl GlossLanguage {
    fn pattern(self) -> &'static Regex {
        match self {
            GlossLanguage::English => &ENGLISH_PATTERN,
            GlossLanguage::Spanish => &SPANISH_PATTERN,
            GlossLanguage::German => &GERMAN_PATTERN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GlossFilterConfig {
    pub language: GlossLanguage,
    pub allow_multiword: bool,
    pub allow_hyphenated: bool,
    pub min_chars: usize,
    pub max_chars: usize,
    pub stopwords: AHashSet<String>,
}

impl Default for GlossFilterConfig {
    fn default() -> Self {
        Self {
            language: GlossLanguage::English,
            allow_multiword: false,
            allow_hyphenated: false,
            min_chars: 2,
            max_chars: 32,
            stopwords: AHashSet::new(),
        }
    }
}

impl GlossFilterConfig {
    /// Whether a normalized gloss is acceptable as a source phrase.
    pub fn accepts(&self, phrase: &str) -> bool {
        let phrase = phrase.trim().to_lowercase();
        if phrase.is_empty() || !phrase.chars().any(|c| c.is_alphabetic()) {
            return false;
        }
        let chars = phrase.chars().count();
        if chars < self.min_chars || chars > self.max_chars {
            return false;
        }
        // possessive glosses ("cat's") never survive tokenization intact
        if phrase.ends_with("'s") || phrase.ends_with('\'') {
            return false;
        }
        if !self.allow_multiword && phrase.contains(' ') {
            return false;
        }
        if !self.allow_hyphenated && phrase.contains('-') {
            return false;
        }
        if !self.language.pattern().is_match(&phrase) {
            return false;
        }
        if self.stopwords.contains(&phrase) {
            return false;
        }
        // a multiword phrase made entirely of stopwords is no better
        if !self.stopwords.is_empty()
            && phrase.split_whitespace().all(|w| self.stopwords.contains(w))
        {
            return false;
        }
        true
    }
}

/// Drop glosses that are just inflections of another gloss in the same set
/// (e.g. "cats" alongside "cat"). Deliberately generated variants carry a
/// `variant` marker and are exempt.
pub fn drop_inflection_artifacts(candidates: Vec<RuleCandidate>) -> Vec<RuleCandidate> {
    let mut by_replacement: AHashMap<String, AHashSet<String>> = AHashMap::new();
    for c in &candidates {
        by_replacement
            .entry(c.replacement.to_lowercase())
            .or_default()
            .insert(c.source_phrase.to_lowercase());
    }

    let is_artifact = |c: &RuleCandidate| -> bool {
        if c.variant.is_some() {
            return false;
        }
        let set = match by_replacement.get(&c.replacement.to_lowercase()) {
            Some(s) => s,
            None => return false,
        };
        let phrase = c.source_phrase.to_lowercase();
        for suffix in ["ing", "ed", "es", "s"] {
            if let Some(stem) = phrase.strip_suffix(suffix) {
                if stem.len() >= 2 && (set.contains(stem) || set.contains(&format!("{}e", stem))) {
                    return true;
                }
            }
        }
        false
    };

    candidates.into_iter().filter(|c| !is_artifact(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GlossFilterConfig {
        GlossFilterConfig::default()
    }

    #[test]
    fn accepts_plain_words() {
        let c = config();
        assert!(c.accepts("cat"));
        assert!(c.accepts("house"));
        assert!(c.accepts("o'clock"));
    }

    #[test]
    fn rejects_junk() {
        let c = config();
        assert!(!c.accepts(""));
        assert!(!c.accepts("   "));
        assert!(!c.accepts("a")); // below min length
        assert!(!c.accepts("cat's"));
        assert!(!c.accepts("dogs'"));
        assert!(!c.accepts("3rd"));
        assert!(!c.accepts("(archaic) cat"));
    }

    #[test]
    fn multiword_and_hyphen_flags() {
        let mut c = config();
        assert!(!c.accepts("hot dog"));
        assert!(!c.accepts("mother-in-law"));
        c.allow_multiword = true;
        c.allow_hyphenated = true;
        assert!(c.accepts("hot dog"));
        assert!(c.accepts("mother-in-law"));
    }

    #[test]
    fn spanish_alphabet() {
        let c = GlossFilterConfig {
            language: GlossLanguage::Spanish,
            ..config()
        };
        assert!(c.accepts("niño"));
        assert!(c.accepts("café"));
        assert!(!config().accepts("niño"));
    }

    #[test]
    fn stopwords_reject() {
        let mut c = config();
        c.stopwords.insert("the".to_string());
        assert!(!c.accepts("the"));
        assert!(c.accepts("cat"));
    }

    #[test]
    fn length_bounds() {
        let c = config();
        let long = "a".repeat(33);
        assert!(!c.accepts(&long));
        assert!(c.accepts(&"a".repeat(32)));
    }

    #[test]
    fn inflection_artifacts_dropped() {
        let mk = |s: &str| RuleCandidate::new(s, "neko", "en-ja", "jmdict", "dictionary");
        let kept = drop_inflection_artifacts(vec![mk("cat"), mk("cats"), mk("dog")]);
        let phrases: Vec<&str> = kept.iter().map(|c| c.source_phrase.as_str()).collect();
        assert_eq!(phrases, vec!["cat", "dog"]);
    }

    #[test]
    fn deliberate_variants_are_exempt() {
        let base = RuleCandidate::new("cat", "neko", "en-ja", "jmdict", "dictionary");
        let mut variant = RuleCandidate::new("cats", "neko", "en-ja", "jmdict", "dictionary");
        variant.variant = Some("inflected".to_string());
        let kept = drop_inflection_artifacts(vec![base, variant]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn silent_e_stems_detected() {
        let mk = |s: &str| RuleCandidate::new(s, "dansu", "en-ja", "jmdict", "dictionary");
        let kept = drop_inflection_artifacts(vec![mk("dance"), mk("dancing")]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].source_phrase, "dance");
    }
}
