//! Word/space/punct tokenization and word normalization.
//!
//! The tokenizer splits text into three token kinds with the guarantee that
//! concatenating the token texts reproduces the input byte-for-byte. Words
//! are ASCII alphanumeric runs with embedded apostrophes ("don't" is one
//! word); whitespace runs and everything else become space and punct tokens.
//!
//! Normalizers are pure. `LowercaseNormalizer` is the default;
//! `SynonymNormalizer` decorates another normalizer with a closed synonym
//! table mapping already-normalized keys to canonical forms.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Word,
    Space,
    Punct,
}

/// A single surface token. `text` is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
}

impl Token {
    pub fn new<T: Into<String>>(text: T, kind: TokenKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }

    pub fn is_space(&self) -> bool {
        self.kind == TokenKind::Space
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

/// Split `text` into word/space/punct tokens.
///
/// Equivalent to scanning with `[A-Za-z0-9]+('[A-Za-z0-9]+)* | \s+ | [^\w\s]+`
/// plus a catch-all punct bucket, so no input byte is ever dropped.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let start = i;
        let c = chars[i];
        if is_word_char(c) {
            i += 1;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            // Interior apostrophe groups: 's, 'nt, chained as in "rock'n'roll".
            while i + 1 < chars.len() && chars[i] == '\'' && is_word_char(chars[i + 1]) {
                i += 2;
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
            }
            tokens.push(Token::new(
                chars[start..i].iter().collect::<String>(),
                TokenKind::Word,
            ));
        } else if c.is_whitespace() {
            i += 1;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(Token::new(
                chars[start..i].iter().collect::<String>(),
                TokenKind::Space,
            ));
        } else {
            i += 1;
            while i < chars.len() && !is_word_char(chars[i]) && !chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(Token::new(
                chars[start..i].iter().collect::<String>(),
                TokenKind::Punct,
            ));
        }
    }
    tokens
}

/// Word normalization used for trie keys and lookups.
pub trait WordNormalizer {
    fn normalize(&self, word: &str) -> String;
}

/// Default normalizer: lowercase fold.
#[derive(Debug, Clone, Default)]
pub struct LowercaseNormalizer;

impl WordNormalizer for LowercaseNormalizer {
    fn normalize(&self, word: &str) -> String {
        word.to_lowercase()
    }
}

/// Decorates another normalizer with a synonym table. Keys must already be
/// in the inner normalizer's normal form.
pub struct SynonymNormalizer<N: WordNormalizer> {
    inner: N,
    synonyms: AHashMap<String, String>,
}

impl<N: WordNormalizer> SynonymNormalizer<N> {
    pub fn new(inner: N, synonyms: AHashMap<String, String>) -> Self {
        Self { inner, synonyms }
    }

    pub fn from_pairs<I, K, V>(inner: N, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let synonyms = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(inner, synonyms)
    }
}

impl<N: WordNormalizer> WordNormalizer for SynonymNormalizer<N> {
    fn normalize(&self, word: &str) -> String {
        let base = self.inner.normalize(word);
        match self.synonyms.get(&base) {
            Some(canonical) => canonical.clone(),
            None => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concat(tokens: &[Token]) -> String {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn tokenize_roundtrips_input() {
        let samples = [
            "I visit New York today",
            "new, york",
            "  leading and trailing  ",
            "don't stop",
            "a--b\t c!?",
            "",
            "mixed añejo text",
        ];
        for s in samples {
            assert_eq!(concat(&tokenize(s)), s, "lossless for {:?}", s);
        }
    }

    #[test]
    fn tokenize_kinds() {
        let toks = tokenize("hot dog!");
        let kinds: Vec<TokenKind> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Word,
                TokenKind::Space,
                TokenKind::Word,
                TokenKind::Punct
            ]
        );
    }

    #[test]
    fn apostrophe_stays_in_word() {
        let toks = tokenize("don't");
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].text, "don't");
        assert!(toks[0].is_word());
    }

    #[test]
    fn trailing_apostrophe_is_punct() {
        let toks = tokenize("dogs'");
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[0].text, "dogs");
        assert_eq!(toks[1].kind, TokenKind::Punct);
    }

    #[test]
    fn synonym_normalizer_maps_after_inner() {
        let n = SynonymNormalizer::from_pairs(LowercaseNormalizer, [("colour", "color")]);
        assert_eq!(n.normalize("Colour"), "color");
        assert_eq!(n.normalize("COLOR"), "color");
        assert_eq!(n.normalize("shade"), "shade");
    }
}
