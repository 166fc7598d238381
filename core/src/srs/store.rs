//! Persisted SRS items and the functional item store.
//!
//! Mutations never edit in place: every operation returns a new store
//! value. Outside a running job the store exists only as on-disk JSON; the
//! owning job loads it, threads new values through its mutations and
//! persists the final value atomically.

use crate::rules::WordPackage;
use crate::srs::scheduler;
use serde::{Deserialize, Serialize};

/// User feedback grades, FSRS-style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "again" => Some(Rating::Again),
            "hard" => Some(Rating::Hard),
            "good" => Some(Rating::Good),
            "easy" => Some(Rating::Easy),
            _ => None,
        }
    }
}

/// One feedback event in an item's append-only history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: i64,
    pub rating: Rating,
}

/// A single learnable item. `item_id` is `pair:lemma`, globally unique per
/// store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrsItem {
    pub item_id: String,
    pub lemma: String,
    pub language_pair: String,
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Memory stability in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<f64>,
    /// Difficulty in [0, 1]; higher is harder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_due: Option<i64>,
    #[serde(default)]
    pub exposures: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_package: Option<WordPackage>,
}

/// Canonical item id for a (pair, lemma).
pub fn item_id(pair: &str, lemma: &str) -> String {
    format!("{}:{}", pair, lemma)
}

impl SrsItem {
    pub fn new<P: Into<String>, L: Into<String>, S: Into<String>>(
        pair: P,
        lemma: L,
        source_type: S,
    ) -> Self {
        let pair = pair.into();
        let lemma = lemma.into();
        Self {
            item_id: item_id(&pair, &lemma),
            lemma,
            language_pair: pair,
            source_type: source_type.into(),
            confidence: None,
            stability: None,
            difficulty: None,
            last_seen: None,
            next_due: None,
            exposures: 0,
            history: Vec::new(),
            word_package: None,
        }
    }
}

/// The persisted item collection (`srs_store.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrsStore {
    #[serde(default)]
    pub items: Vec<SrsItem>,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl Default for SrsStore {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            version: 1,
        }
    }
}

impl SrsStore {
    pub fn find(&self, pair: &str, lemma: &str) -> Option<&SrsItem> {
        let id = item_id(pair, lemma);
        self.items.iter().find(|i| i.item_id == id)
    }

    pub fn items_for_pair<'a>(&'a self, pair: &'a str) -> impl Iterator<Item = &'a SrsItem> {
        self.items.iter().filter(move |i| i.language_pair == pair)
    }

    /// Replace the item with the same `item_id`, or append.
    pub fn upsert_item(&self, item: SrsItem) -> SrsStore {
        let mut next = self.clone();
        match next.items.iter_mut().find(|i| i.item_id == item.item_id) {
            Some(slot) => *slot = item,
            None => next.items.push(item),
        }
        next
    }

    /// Record a passive exposure. Missing items are created with defaults
    /// when `create_if_missing` is set; otherwise the store is returned
    /// unchanged.
    pub fn record_exposure(
        &self,
        pair: &str,
        lemma: &str,
        now: i64,
        create_if_missing: bool,
    ) -> SrsStore {
        match self.find(pair, lemma) {
            Some(existing) => {
                let mut item = existing.clone();
                item.exposures = item.exposures.saturating_add(1);
                item.last_seen = Some(now);
                self.upsert_item(item)
            }
            None if create_if_missing => {
                let mut item = SrsItem::new(pair, lemma, "exposure");
                item.exposures = 1;
                item.last_seen = Some(now);
                item.stability = Some(scheduler::INITIAL_STABILITY_DAYS);
                item.difficulty = Some(scheduler::INITIAL_DIFFICULTY);
                self.upsert_item(item)
            }
            None => self.clone(),
        }
    }

    /// Apply feedback to an item: FSRS-lite update, history append, and an
    /// exposure bump when requested. Feedback for an unknown item is a
    /// no-op; ratings only make sense for admitted items.
    pub fn record_feedback(
        &self,
        pair: &str,
        lemma: &str,
        rating: Rating,
        now: i64,
        bump_exposure: bool,
    ) -> SrsStore {
        match self.find(pair, lemma) {
            Some(existing) => {
                let mut item = scheduler::apply_feedback(existing, rating, now);
                item.history.push(HistoryEntry { ts: now, rating });
                if bump_exposure {
                    item.exposures = item.exposures.saturating_add(1);
                }
                self.upsert_item(item)
            }
            None => self.clone(),
        }
    }
}
