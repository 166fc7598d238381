//! Longest-match phrase replacement over tokenized text.
//!
//! A `VocabPool` compiles a dataset into a phrase trie together with the
//! normalizer used for both rule keys and input words. A `Replacer` borrows
//! a pool for the duration of a call; replacement is pure and never errors.
//! Matches are emitted strictly left-to-right without overlap, so output is
//! deterministic for a given dataset and input.

use crate::rules::{CasePolicy, VocabDataset, VocabRule};
use crate::token::{tokenize, Token, WordNormalizer};
use crate::trie::PhraseTrie;
use std::sync::Arc;
use tracing::debug;

/// A non-overlapping match over word indices (inclusive bounds).
#[derive(Debug, Clone)]
pub struct Match {
    pub start_word_index: usize,
    pub end_word_index: usize,
    pub rule: Arc<VocabRule>,
}

/// Character span of a spliced replacement within the rewritten text.
#[derive(Debug, Clone)]
pub struct Span {
    pub start_char: usize,
    pub end_char: usize,
    pub matched: Match,
}

/// Compiled rule set: trie plus the normalizer it was keyed with.
pub struct VocabPool<N: WordNormalizer> {
    trie: PhraseTrie,
    normalizer: N,
    rule_count: usize,
}

impl<N: WordNormalizer> VocabPool<N> {
    /// Compile the dataset's effective rules into a trie.
    ///
    /// Rules whose source phrase yields no word tokens after normalization
    /// are skipped; they cannot match anything.
    pub fn compile(dataset: &VocabDataset, normalizer: N) -> Self {
        let mut trie = PhraseTrie::new();
        let mut rule_count = 0usize;
        for rule in dataset.effective_rules() {
            let words: Vec<String> = tokenize(&rule.source_phrase)
                .iter()
                .filter(|t| t.is_word())
                .map(|t| normalizer.normalize(&t.text))
                .collect();
            if words.is_empty() {
                debug!(source = %rule.source_phrase, "skipping rule with empty normalized source");
                continue;
            }
            trie.insert(&words, Arc::new(rule));
            rule_count += 1;
        }
        Self {
            trie,
            normalizer,
            rule_count,
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    pub fn trie(&self) -> &PhraseTrie {
        &self.trie
    }
}

/// Borrows a compiled pool and rewrites text.
pub struct Replacer<'a, N: WordNormalizer> {
    pool: &'a VocabPool<N>,
}

impl<'a, N: WordNormalizer> Replacer<'a, N> {
    pub fn new(pool: &'a VocabPool<N>) -> Self {
        Self { pool }
    }

    /// Rewrite `text`, returning only the new string.
    pub fn replace(&self, text: &str) -> String {
        self.replace_with_spans(text).0
    }

    /// Rewrite `text` and report the character span of every replacement
    /// within the output.
    pub fn replace_with_spans(&self, text: &str) -> (String, Vec<Span>) {
        let tokens = tokenize(text);
        let matches = self.find_matches(&tokens);
        apply_matches(&tokens, &matches)
    }

    /// Emit matches without rewriting. Spans are word-index based.
    pub fn find_in(&self, text: &str) -> Vec<Match> {
        self.find_matches(&tokenize(text))
    }

    fn find_matches(&self, tokens: &[Token]) -> Vec<Match> {
        let word_positions: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_word())
            .map(|(i, _)| i)
            .collect();
        if word_positions.is_empty() || self.pool.trie.is_empty() {
            return Vec::new();
        }

        // gap_ok[i]: tokens strictly between word i and word i+1 are all
        // spaces. Punctuation breaks multi-word matches.
        let gap_ok: Vec<bool> = word_positions
            .windows(2)
            .map(|w| tokens[w[0] + 1..w[1]].iter().all(|t| t.is_space()))
            .collect();

        let normalized: Vec<String> = word_positions
            .iter()
            .map(|&i| self.pool.normalizer.normalize(&tokens[i].text))
            .collect();

        let mut matches = Vec::new();
        let mut wi = 0usize;
        while wi < word_positions.len() {
            let mut node = self.pool.trie.root();
            let mut best: Option<(usize, Arc<VocabRule>)> = None;
            let mut j = wi;
            loop {
                node = match node.child(&normalized[j]) {
                    Some(n) => n,
                    None => break,
                };
                if let Some(rule) = node.best_rule() {
                    // Longest terminal wins; the trie already resolved
                    // priority per terminal.
                    best = Some((j, rule.clone()));
                }
                if j + 1 >= word_positions.len() || !gap_ok[j] {
                    break;
                }
                j += 1;
            }
            match best {
                Some((end, rule)) => {
                    matches.push(Match {
                        start_word_index: wi,
                        end_word_index: end,
                        rule,
                    });
                    wi = end + 1;
                }
                None => wi += 1,
            }
        }
        matches
    }
}

fn apply_matches(tokens: &[Token], matches: &[Match]) -> (String, Vec<Span>) {
    let word_positions: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_word())
        .map(|(i, _)| i)
        .collect();

    let mut out = String::new();
    let mut out_chars = 0usize;
    let mut spans = Vec::with_capacity(matches.len());
    let mut next_match = matches.iter().peekable();
    let mut ti = 0usize;

    while ti < tokens.len() {
        let consumed = next_match.peek().and_then(|m| {
            let first = word_positions[m.start_word_index];
            if first == ti {
                Some((first, word_positions[m.end_word_index]))
            } else {
                None
            }
        });
        match consumed {
            Some((first, last)) => {
                let m = next_match.next().unwrap();
                let source_words: Vec<&str> = tokens[first..=last]
                    .iter()
                    .filter(|t| t.is_word())
                    .map(|t| t.text.as_str())
                    .collect();
                let replacement =
                    apply_case_policy(&m.rule.replacement, m.rule.case_policy, &source_words);
                let start_char = out_chars;
                out_chars += replacement.chars().count();
                out.push_str(&replacement);
                spans.push(Span {
                    start_char,
                    end_char: out_chars,
                    matched: m.clone(),
                });
                ti = last + 1;
            }
            None => {
                out_chars += tokens[ti].text.chars().count();
                out.push_str(&tokens[ti].text);
                ti += 1;
            }
        }
    }
    (out, spans)
}

/// Transform a replacement string under the rule's case policy.
pub fn apply_case_policy(replacement: &str, policy: CasePolicy, source_words: &[&str]) -> String {
    match policy {
        CasePolicy::AsIs => replacement.to_string(),
        CasePolicy::Lower => replacement.to_lowercase(),
        CasePolicy::Upper => replacement.to_uppercase(),
        CasePolicy::Title => title_case(replacement),
        CasePolicy::Match => {
            let joined: String = source_words.concat();
            let has_letters = joined.chars().any(|c| c.is_alphabetic());
            if has_letters && joined.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase())
            {
                replacement.to_uppercase()
            } else if source_words
                .first()
                .and_then(|w| w.chars().next())
                .map(|c| c.is_uppercase())
                .unwrap_or(false)
            {
                title_case(replacement)
            } else {
                replacement.to_string()
            }
        }
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::LowercaseNormalizer;

    fn pool(rules: Vec<VocabRule>) -> VocabPool<LowercaseNormalizer> {
        VocabPool::compile(&VocabDataset::new(rules), LowercaseNormalizer)
    }

    #[test]
    fn case_match_capitalized_source() {
        let p = pool(vec![
            VocabRule::new("new york", "gotham").with_case_policy(CasePolicy::Match)
        ]);
        let r = Replacer::new(&p);
        let (out, spans) = r.replace_with_spans("I visit New York today");
        assert_eq!(out, "I visit Gotham today");
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].start_char, spans[0].end_char), (8, 14));
    }

    #[test]
    fn case_match_uppercase_source() {
        let p = pool(vec![
            VocabRule::new("new york", "gotham").with_case_policy(CasePolicy::Match)
        ]);
        let r = Replacer::new(&p);
        assert_eq!(r.replace("NEW YORK rules"), "GOTHAM rules");
    }

    #[test]
    fn case_match_mixed_falls_through_to_literal() {
        let p = pool(vec![
            VocabRule::new("new york", "gotham").with_case_policy(CasePolicy::Match)
        ]);
        let r = Replacer::new(&p);
        assert_eq!(r.replace("nEW yORK"), "gotham");
    }

    #[test]
    fn longest_match_beats_shorter() {
        let p = pool(vec![
            VocabRule::new("hot", "warm"),
            VocabRule::new("hot dog", "sausage"),
        ]);
        let r = Replacer::new(&p);
        assert_eq!(r.replace("a hot dog"), "a sausage");
    }

    #[test]
    fn punctuation_breaks_gap() {
        let p = pool(vec![VocabRule::new("new york", "gotham")]);
        let r = Replacer::new(&p);
        assert_eq!(r.replace("new, york"), "new, york");
    }

    #[test]
    fn non_matched_spans_preserved() {
        let p = pool(vec![VocabRule::new("cat", "neko")]);
        let r = Replacer::new(&p);
        assert_eq!(
            r.replace("the  cat, \tand the cat!"),
            "the  neko, \tand the neko!"
        );
    }

    #[test]
    fn matches_non_overlapping_and_increasing() {
        let p = pool(vec![VocabRule::new("a b", "x"), VocabRule::new("b", "y")]);
        let r = Replacer::new(&p);
        let found = r.find_in("a b b a b");
        let mut last_end = None;
        for m in &found {
            assert!(m.start_word_index <= m.end_word_index);
            if let Some(end) = last_end {
                assert!(m.start_word_index > end);
            }
            last_end = Some(m.end_word_index);
        }
        assert_eq!(r.replace("a b b a b"), "x y x");
    }

    #[test]
    fn fixed_case_policies() {
        let src = ["Cat"];
        assert_eq!(apply_case_policy("neko", CasePolicy::Upper, &src), "NEKO");
        assert_eq!(apply_case_policy("NEKO", CasePolicy::Lower, &src), "neko");
        assert_eq!(
            apply_case_policy("big apple", CasePolicy::Title, &src),
            "Big Apple"
        );
        assert_eq!(apply_case_policy("nEkO", CasePolicy::AsIs, &src), "nEkO");
    }

    #[test]
    fn empty_source_rule_skipped_at_compile() {
        let p = pool(vec![VocabRule::new("?!", "x"), VocabRule::new("ok", "y")]);
        assert_eq!(p.rule_count(), 1);
        let r = Replacer::new(&p);
        assert_eq!(r.replace("?! ok"), "?! y");
    }
}
