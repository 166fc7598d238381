//! English inflection expansion without morphological analysis.
//!
//! Suffix rules only, with irregular-form overrides and a blocked-word set.
//! In strict mode, forms that would require consonant doubling (pat →
//! patted) are rejected rather than guessed; in permissive mode the final
//! consonant is doubled.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InflectionForm {
    Plural,
    Possessive,
    Past,
    Gerund,
    ThirdPerson,
}

/// Which words of a phrase receive the inflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplyTo {
    #[default]
    LastWord,
    AllWords,
}

/// Expansion request for `expand_phrase`.
#[derive(Debug, Clone)]
pub struct ExpansionSpec {
    pub forms: BTreeSet<InflectionForm>,
    pub apply_to: ApplyTo,
    pub include_original: bool,
}

impl ExpansionSpec {
    pub fn new<I: IntoIterator<Item = InflectionForm>>(forms: I) -> Self {
        Self {
            forms: forms.into_iter().collect(),
            apply_to: ApplyTo::LastWord,
            include_original: true,
        }
    }

    pub fn apply_to(mut self, apply_to: ApplyTo) -> Self {
        self.apply_to = apply_to;
        self
    }

    pub fn include_original(mut self, include: bool) -> Self {
        self.include_original = include;
        self
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// True when the final syllable pattern (consonant, vowel, consonant not in
/// `wxy`) calls for doubling the last consonant before -ed/-ing.
pub fn needs_consonant_doubling(word: &str) -> bool {
    let chars: Vec<char> = word.to_lowercase().chars().collect();
    let n = chars.len();
    if n < 3 {
        return false;
    }
    let last = chars[n - 1];
    let prev = chars[n - 2];
    let before = chars[n - 3];
    last.is_ascii_alphabetic()
        && !is_vowel(last)
        && !matches!(last, 'w' | 'x' | 'y')
        && is_vowel(prev)
        && before.is_ascii_alphabetic()
        && !is_vowel(before)
}

/// Inflection engine with per-form irregular overrides.
pub struct InflectionEngine {
    overrides: AHashMap<InflectionForm, AHashMap<String, Vec<String>>>,
    blocked: AHashSet<String>,
    strict: bool,
}

impl Default for InflectionEngine {
    fn default() -> Self {
        Self::english()
    }
}

impl InflectionEngine {
    /// Engine with the built-in English irregular tables, strict mode on.
    pub fn english() -> Self {
        let mut engine = Self {
            overrides: AHashMap::new(),
            blocked: AHashSet::new(),
            strict: true,
        };
        for (word, forms) in IRREGULAR_PLURALS {
            engine.add_override(InflectionForm::Plural, word, forms);
        }
        for (word, forms) in IRREGULAR_PASTS {
            engine.add_override(InflectionForm::Past, word, forms);
        }
        for (word, forms) in IRREGULAR_GERUNDS {
            engine.add_override(InflectionForm::Gerund, word, forms);
        }
        for (word, forms) in IRREGULAR_THIRD_PERSON {
            engine.add_override(InflectionForm::ThirdPerson, word, forms);
        }
        engine
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn add_override(&mut self, form: InflectionForm, word: &str, forms: &[&str]) {
        self.overrides
            .entry(form)
            .or_default()
            .insert(word.to_string(), forms.iter().map(|s| s.to_string()).collect());
    }

    /// Words to remove from the final expansion output.
    pub fn block_word(&mut self, word: &str) {
        self.blocked.insert(word.to_lowercase());
    }

    fn override_for(&self, form: InflectionForm, word: &str) -> Option<Vec<String>> {
        self.overrides
            .get(&form)
            .and_then(|m| m.get(&word.to_lowercase()))
            .cloned()
    }

    /// Produce all surfaces for one word in one form. An empty result means
    /// the form was rejected (strict doubling).
    pub fn inflect(&self, word: &str, form: InflectionForm) -> Vec<String> {
        if let Some(forms) = self.override_for(form, word) {
            return forms;
        }
        let w = word.to_lowercase();
        match form {
            InflectionForm::Plural | InflectionForm::ThirdPerson => {
                vec![sibilant_plural(&w)]
            }
            InflectionForm::Possessive => {
                if w.ends_with('s') {
                    vec![format!("{}'", w)]
                } else {
                    vec![format!("{}'s", w)]
                }
            }
            InflectionForm::Past => {
                if needs_consonant_doubling(&w) {
                    if self.strict {
                        return Vec::new();
                    }
                    let last = w.chars().last().unwrap_or_default();
                    return vec![format!("{}{}ed", w, last)];
                }
                if w.ends_with('e') {
                    vec![format!("{}d", w)]
                } else if ends_in_consonant_y(&w) {
                    vec![format!("{}ied", &w[..w.len() - 1])]
                } else {
                    vec![format!("{}ed", w)]
                }
            }
            InflectionForm::Gerund => {
                if needs_consonant_doubling(&w) {
                    if self.strict {
                        return Vec::new();
                    }
                    let last = w.chars().last().unwrap_or_default();
                    return vec![format!("{}{}ing", w, last)];
                }
                if w.ends_with("ie") {
                    vec![format!("{}ying", &w[..w.len() - 2])]
                } else if w.ends_with('e')
                    && !w.ends_with("ee")
                    && !w.ends_with("ye")
                    && !w.ends_with("oe")
                {
                    vec![format!("{}ing", &w[..w.len() - 1])]
                } else {
                    vec![format!("{}ing", w)]
                }
            }
        }
    }

    /// Expand a phrase into inflected variants.
    ///
    /// Target words are chosen by `spec.apply_to`; each requested form
    /// substitutes the target word and reassembles the phrase. The result is
    /// an unordered set, with blocked words removed.
    pub fn expand_phrase(&self, phrase: &str, spec: &ExpansionSpec) -> BTreeSet<String> {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        let mut out = BTreeSet::new();
        if words.is_empty() {
            return out;
        }
        if spec.include_original {
            out.insert(phrase.to_string());
        }
        let targets: Vec<usize> = match spec.apply_to {
            ApplyTo::LastWord => vec![words.len() - 1],
            ApplyTo::AllWords => (0..words.len()).collect(),
        };
        for &idx in &targets {
            for &form in &spec.forms {
                for surface in self.inflect(words[idx], form) {
                    if self.blocked.contains(&surface.to_lowercase()) {
                        continue;
                    }
                    let mut rebuilt: Vec<&str> = words.clone();
                    rebuilt[idx] = &surface;
                    out.insert(rebuilt.join(" "));
                }
            }
        }
        out.retain(|p| {
            !p.split_whitespace()
                .any(|w| self.blocked.contains(&w.to_lowercase()))
        });
        out
    }
}

fn ends_in_consonant_y(w: &str) -> bool {
    let chars: Vec<char> = w.chars().collect();
    let n = chars.len();
    n >= 2 && chars[n - 1] == 'y' && !is_vowel(chars[n - 2])
}

fn sibilant_plural(w: &str) -> String {
    if w.ends_with('s')
        || w.ends_with('x')
        || w.ends_with('z')
        || w.ends_with("ch")
        || w.ends_with("sh")
    {
        format!("{}es", w)
    } else if ends_in_consonant_y(w) {
        format!("{}ies", &w[..w.len() - 1])
    } else {
        format!("{}s", w)
    }
}

const IRREGULAR_PLURALS: &[(&str, &[&str])] = &[
    ("child", &["children"]),
    ("person", &["people"]),
    ("man", &["men"]),
    ("woman", &["women"]),
    ("foot", &["feet"]),
    ("tooth", &["teeth"]),
    ("mouse", &["mice"]),
    ("goose", &["geese"]),
    ("sheep", &["sheep"]),
    ("fish", &["fish"]),
    ("deer", &["deer"]),
];

const IRREGULAR_PASTS: &[(&str, &[&str])] = &[
    ("go", &["went"]),
    ("be", &["was", "were"]),
    ("have", &["had"]),
    ("do", &["did"]),
    ("say", &["said"]),
    ("make", &["made"]),
    ("take", &["took"]),
    ("come", &["came"]),
    ("see", &["saw"]),
    ("get", &["got"]),
    ("run", &["ran"]),
    ("eat", &["ate"]),
    ("give", &["gave"]),
    ("find", &["found"]),
    ("think", &["thought"]),
    ("tell", &["told"]),
    ("buy", &["bought"]),
];

const IRREGULAR_GERUNDS: &[(&str, &[&str])] = &[
    ("be", &["being"]),
    ("run", &["running"]),
    ("get", &["getting"]),
    ("sit", &["sitting"]),
    ("swim", &["swimming"]),
];

const IRREGULAR_THIRD_PERSON: &[(&str, &[&str])] = &[
    ("be", &["is"]),
    ("have", &["has"]),
    ("go", &["goes"]),
    ("do", &["does"]),
];
