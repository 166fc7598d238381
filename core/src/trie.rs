//! Phrase trie for longest-match multi-word substitution.
//!
//! Keys are sequences of normalized word tokens; each terminal node keeps
//! the single best rule whose key ends there. Insertion is idempotent per
//! (tokens, rule): on collision the strictly higher-priority rule wins and
//! ties keep the earlier insertion.

use crate::rules::VocabRule;
use ahash::AHashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct PhraseTrieNode {
    children: AHashMap<String, Box<PhraseTrieNode>>,
    /// Highest-priority rule terminating at this node, if any.
    best_rule: Option<Arc<VocabRule>>,
}

impl PhraseTrieNode {
    pub fn child(&self, word: &str) -> Option<&PhraseTrieNode> {
        self.children.get(word).map(|b| b.as_ref())
    }

    pub fn best_rule(&self) -> Option<&Arc<VocabRule>> {
        self.best_rule.as_ref()
    }
}

/// Trie over normalized word paths.
///
/// # Example
/// ```
/// use lexishift_core::rules::VocabRule;
/// use lexishift_core::trie::PhraseTrie;
/// use std::sync::Arc;
///
/// let mut trie = PhraseTrie::new();
/// trie.insert(&["hot".into(), "dog".into()], Arc::new(VocabRule::new("hot dog", "sausage")));
/// let node = trie.root().child("hot").unwrap().child("dog").unwrap();
/// assert!(node.best_rule().is_some());
/// ```
#[derive(Debug, Default)]
pub struct PhraseTrie {
    root: PhraseTrieNode,
    len: usize,
}

impl PhraseTrie {
    pub fn new() -> Self {
        Self {
            root: PhraseTrieNode::default(),
            len: 0,
        }
    }

    pub fn root(&self) -> &PhraseTrieNode {
        &self.root
    }

    /// Number of distinct terminal paths.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a rule under its normalized word path.
    ///
    /// Empty paths are rejected (a rule whose source normalizes to nothing
    /// has no place in the trie). Returns true when the rule became the
    /// terminal's `best_rule`.
    pub fn insert(&mut self, words: &[String], rule: Arc<VocabRule>) -> bool {
        if words.is_empty() {
            return false;
        }
        let mut node = &mut self.root;
        for word in words {
            node = node
                .children
                .entry(word.clone())
                .or_insert_with(|| Box::new(PhraseTrieNode::default()));
        }
        match &node.best_rule {
            None => {
                node.best_rule = Some(rule);
                self.len += 1;
                true
            }
            // Strictly higher priority wins; ties keep the earlier insert.
            Some(existing) if rule.priority > existing.priority => {
                node.best_rule = Some(rule);
                true
            }
            Some(_) => false,
        }
    }

    /// Walk a word path and return the terminal rule, if the exact path
    /// exists and carries one.
    pub fn lookup(&self, words: &[String]) -> Option<&Arc<VocabRule>> {
        let mut node = &self.root;
        for word in words {
            node = node.children.get(word)?.as_ref();
        }
        node.best_rule.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &[&str]) -> Vec<String> {
        s.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn insert_and_lookup() {
        let mut trie = PhraseTrie::new();
        trie.insert(
            &words(&["new", "york"]),
            Arc::new(VocabRule::new("new york", "gotham")),
        );
        let rule = trie.lookup(&words(&["new", "york"])).expect("terminal");
        assert_eq!(rule.replacement, "gotham");
        assert!(trie.lookup(&words(&["new"])).is_none());
    }

    #[test]
    fn higher_priority_wins_ties_keep_first() {
        let mut trie = PhraseTrie::new();
        let low = Arc::new(VocabRule::new("hot", "warm").with_priority(0));
        let tie = Arc::new(VocabRule::new("hot", "toasty").with_priority(0));
        let high = Arc::new(VocabRule::new("hot", "scalding").with_priority(5));

        assert!(trie.insert(&words(&["hot"]), low));
        assert!(!trie.insert(&words(&["hot"]), tie));
        assert_eq!(trie.lookup(&words(&["hot"])).unwrap().replacement, "warm");

        assert!(trie.insert(&words(&["hot"]), high));
        assert_eq!(
            trie.lookup(&words(&["hot"])).unwrap().replacement,
            "scalding"
        );
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn insertion_order_does_not_change_winner() {
        let a = Arc::new(VocabRule::new("x", "a").with_priority(1));
        let b = Arc::new(VocabRule::new("x", "b").with_priority(3));

        let mut t1 = PhraseTrie::new();
        t1.insert(&words(&["x"]), a.clone());
        t1.insert(&words(&["x"]), b.clone());

        let mut t2 = PhraseTrie::new();
        t2.insert(&words(&["x"]), b);
        t2.insert(&words(&["x"]), a);

        assert_eq!(
            t1.lookup(&words(&["x"])).unwrap().replacement,
            t2.lookup(&words(&["x"])).unwrap().replacement
        );
    }

    #[test]
    fn empty_path_rejected() {
        let mut trie = PhraseTrie::new();
        assert!(!trie.insert(&[], Arc::new(VocabRule::new("", "x"))));
        assert!(trie.is_empty());
    }
}
