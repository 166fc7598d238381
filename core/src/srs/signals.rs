//! Ordered, append-only signal log and feedback-window statistics.
//!
//! Feedback and exposure events flow in from readers (extension, GUI);
//! admission refresh reads the most recent N feedback events per pair to
//! estimate retention and strain.

use crate::srs::store::Rating;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Feedback,
    Exposure,
}

/// One logged signal. Readers always see a prefix of the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub event_type: SignalKind,
    pub pair: String,
    pub lemma: String,
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    pub ts: i64,
}

impl SignalEvent {
    pub fn feedback<P: Into<String>, L: Into<String>>(
        pair: P,
        lemma: L,
        rating: Rating,
        ts: i64,
    ) -> Self {
        Self {
            event_type: SignalKind::Feedback,
            pair: pair.into(),
            lemma: lemma.into(),
            source_type: "frequency_list".to_string(),
            rating: Some(rating),
            ts,
        }
    }

    pub fn exposure<P: Into<String>, L: Into<String>>(pair: P, lemma: L, ts: i64) -> Self {
        Self {
            event_type: SignalKind::Exposure,
            pair: pair.into(),
            lemma: lemma.into(),
            source_type: "frequency_list".to_string(),
            rating: None,
            ts,
        }
    }
}

/// The persisted event log (`srs_signal_queue.json`). Append-only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalQueue {
    #[serde(default)]
    pub events: Vec<SignalEvent>,
}

impl SignalQueue {
    pub fn append(&self, event: SignalEvent) -> SignalQueue {
        let mut next = self.clone();
        next.events.push(event);
        next
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Rating tallies over the most recent feedback events for one pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackWindowStats {
    pub again: usize,
    pub hard: usize,
    pub good: usize,
    pub easy: usize,
    pub total: usize,
}

impl FeedbackWindowStats {
    /// `(good + easy) / total`; None when the window is empty.
    pub fn retention(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some((self.good + self.easy) as f64 / self.total as f64)
        }
    }

    /// `(again + hard) / total`; None when the window is empty.
    pub fn strain(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some((self.again + self.hard) as f64 / self.total as f64)
        }
    }
}

/// Tally the most recent `window_size` feedback events for `pair`.
/// Exposure events and other pairs are ignored.
pub fn feedback_window(events: &[SignalEvent], pair: &str, window_size: usize) -> FeedbackWindowStats {
    let mut stats = FeedbackWindowStats::default();
    for event in events
        .iter()
        .rev()
        .filter(|e| e.event_type == SignalKind::Feedback && e.pair == pair)
        .take(window_size)
    {
        match event.rating {
            Some(Rating::Again) => stats.again += 1,
            Some(Rating::Hard) => stats.hard += 1,
            Some(Rating::Good) => stats.good += 1,
            Some(Rating::Easy) => stats.easy += 1,
            None => continue,
        }
        stats.total += 1;
    }
    stats
}
