//! Variant expanders: derive inflected source phrases so the replacer also
//! catches "cats" when the dictionary only listed "cat".

use crate::candidate::RuleCandidate;
use crate::pipeline::CandidateExpander;
use lexishift_core::{ExpansionSpec, InflectionEngine, InflectionForm};

/// English expander backed by the suffix-rule inflection engine. Strict
/// mode is kept on so consonant-doubling guesses never leak into rules.
pub struct EnglishInflectionExpander {
    engine: InflectionEngine,
    spec: ExpansionSpec,
}

impl Default for EnglishInflectionExpander {
    fn default() -> Self {
        Self {
            engine: InflectionEngine::english(),
            spec: ExpansionSpec::new([InflectionForm::Plural]).include_original(false),
        }
    }
}

impl EnglishInflectionExpander {
    pub fn with_forms<I: IntoIterator<Item = InflectionForm>>(forms: I) -> Self {
        Self {
            engine: InflectionEngine::english(),
            spec: ExpansionSpec::new(forms).include_original(false),
        }
    }
}

impl CandidateExpander for EnglishInflectionExpander {
    fn expand(&self, candidate: &RuleCandidate) -> Vec<RuleCandidate> {
        self.engine
            .expand_phrase(&candidate.source_phrase, &self.spec)
            .into_iter()
            .filter(|surface| surface != &candidate.source_phrase)
            .map(|surface| {
                let mut variant = candidate.clone();
                variant.source_phrase = surface;
                variant.variant = Some("inflected".to_string());
                variant
            })
            .collect()
    }
}

fn spanish_plural(word: &str) -> Option<String> {
    let last = word.chars().last()?;
    match last {
        'a' | 'e' | 'i' | 'o' | 'u' => Some(format!("{}s", word)),
        'z' => Some(format!("{}ces", &word[..word.len() - 1])),
        's' => None,
        c if c.is_alphabetic() => Some(format!("{}es", word)),
        _ => None,
    }
}

/// Spanish pluralizer applied to the last word of the phrase.
#[derive(Default)]
pub struct SpanishPluralExpander;

impl CandidateExpander for SpanishPluralExpander {
    fn expand(&self, candidate: &RuleCandidate) -> Vec<RuleCandidate> {
        let mut words: Vec<&str> = candidate.source_phrase.split_whitespace().collect();
        let last = match words.last() {
            Some(&w) => w,
            None => return Vec::new(),
        };
        let plural = match spanish_plural(last) {
            Some(p) => p,
            None => return Vec::new(),
        };
        let n = words.len();
        words[n - 1] = &plural;
        let mut variant = candidate.clone();
        variant.source_phrase = words.join(" ");
        variant.variant = Some("inflected".to_string());
        vec![variant]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(source: &str) -> RuleCandidate {
        RuleCandidate::new(source, "neko", "en-ja", "jmdict", "dictionary")
    }

    #[test]
    fn english_plural_variant() {
        let expander = EnglishInflectionExpander::default();
        let variants = expander.expand(&candidate("cat"));
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].source_phrase, "cats");
        assert_eq!(variants[0].variant.as_deref(), Some("inflected"));
        assert_eq!(variants[0].replacement, "neko");
    }

    #[test]
    fn strict_doubling_produces_nothing() {
        let expander = EnglishInflectionExpander::with_forms([InflectionForm::Past]);
        assert!(expander.expand(&candidate("pat")).is_empty());
    }

    #[test]
    fn spanish_plurals() {
        assert_eq!(spanish_plural("gato").as_deref(), Some("gatos"));
        assert_eq!(spanish_plural("pared").as_deref(), Some("paredes"));
        assert_eq!(spanish_plural("lápiz").as_deref(), Some("lápices"));
        assert_eq!(spanish_plural("lunes"), None);
    }

    #[test]
    fn spanish_expander_targets_last_word() {
        let expander = SpanishPluralExpander;
        let mut c = candidate("casa azul");
        c.language_pair = "en-es".to_string();
        let variants = expander.expand(&c);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].source_phrase, "casa azules");
    }
}
