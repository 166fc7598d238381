//! Admission refresh: decide how many new items may enter the active set
//! and apply the decision against a candidate pool.
//!
//! A zero budget is a structured outcome with a reason code, not an error.
//! Missing signals degrade: an unknown retention leaves the base budget
//! untouched.

use crate::seed::SeedWord;
use crate::srs::scheduler::{self, select_active_items};
use crate::srs::signals::{feedback_window, SignalEvent};
use crate::srs::store::{item_id, SrsItem, SrsStore};
use crate::srs::SrsSettings;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdmissionThresholds {
    pub retention_low: f64,
    pub retention_mid: f64,
    pub due_pressure_high: f64,
}

impl Default for AdmissionThresholds {
    fn default() -> Self {
        Self {
            retention_low: 0.55,
            retention_mid: 0.70,
            due_pressure_high: 0.80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRefreshPolicy {
    pub feedback_window_size: usize,
    pub min_feedback_events: usize,
    pub partial_admission_ratio: f64,
    #[serde(default)]
    pub thresholds: AdmissionThresholds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_active_items_override: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_new_items_override: Option<u32>,
}

impl Default for AdmissionRefreshPolicy {
    fn default() -> Self {
        Self {
            feedback_window_size: 50,
            min_feedback_events: 8,
            partial_admission_ratio: 0.5,
            thresholds: AdmissionThresholds::default(),
            max_active_items_override: None,
            max_new_items_override: None,
        }
    }
}

/// Outcome of the admission decision, persisted into diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    pub pair: String,
    pub max_active: usize,
    pub max_new: usize,
    pub due_count: usize,
    pub due_pressure: f64,
    pub capacity: usize,
    pub base_budget: usize,
    pub feedback_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strain: Option<f64>,
    pub admission_budget: usize,
    pub reason_code: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Compute the admission budget for one pair.
pub fn decide_admission(
    store: &SrsStore,
    settings: &SrsSettings,
    pair: &str,
    now: i64,
    events: &[SignalEvent],
    policy: &AdmissionRefreshPolicy,
) -> AdmissionDecision {
    let max_active = policy
        .max_active_items_override
        .unwrap_or(settings.max_active_items) as usize;
    let max_new = policy
        .max_new_items_override
        .unwrap_or(settings.max_new_items_per_day) as usize;

    let allowed = [pair.to_string()];
    let due_count = select_active_items(&store.items, now, max_active, &allowed).len();
    let due_pressure = if max_active > 0 {
        due_count as f64 / max_active as f64
    } else {
        1.0
    };
    let capacity = max_active.saturating_sub(due_count);
    let base_budget = max_new.min(capacity);

    let stats = feedback_window(events, pair, policy.feedback_window_size);
    let retention = stats.retention();
    let strain = stats.strain();

    let mut notes = Vec::new();
    let (admission_budget, reason_code) = if base_budget == 0 {
        (0, "capacity_exhausted")
    } else if due_pressure > policy.thresholds.due_pressure_high {
        (0, "due_pressure_high")
    } else if stats.total >= policy.min_feedback_events {
        let r = retention.unwrap_or(1.0);
        if r < policy.thresholds.retention_low {
            (0, "retention_low")
        } else if r < policy.thresholds.retention_mid {
            let partial = ((base_budget as f64) * policy.partial_admission_ratio).floor() as usize;
            (partial.max(1), "retention_mid")
        } else {
            (base_budget, "normal")
        }
    } else {
        notes.push("small feedback window".to_string());
        (base_budget, "normal")
    };

    info!(
        pair,
        due_count,
        base_budget,
        admission_budget,
        reason_code,
        "admission decision"
    );

    AdmissionDecision {
        pair: pair.to_string(),
        max_active,
        max_new,
        due_count,
        due_pressure,
        capacity,
        base_budget,
        feedback_count: stats.total,
        retention,
        strain,
        admission_budget,
        reason_code: reason_code.to_string(),
        notes,
    }
}

/// Apply a positive budget: admit the top candidates not yet in the store
/// for this pair. Returns the new store and the admitted lemmas.
pub fn apply_admission(
    store: &SrsStore,
    pair: &str,
    candidates: &[SeedWord],
    budget: usize,
    now: i64,
) -> (SrsStore, Vec<String>) {
    if budget == 0 {
        return (store.clone(), Vec::new());
    }
    let mut ranked: Vec<&SeedWord> = candidates.iter().collect();
    ranked.sort_by(|a, b| {
        b.admission_weight
            .partial_cmp(&a.admission_weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.lemma.cmp(&b.lemma))
    });

    let mut next = store.clone();
    let mut admitted = Vec::new();
    for candidate in ranked {
        if admitted.len() >= budget {
            break;
        }
        let id = item_id(pair, &candidate.lemma);
        if next.items.iter().any(|i| i.item_id == id) {
            continue;
        }
        let mut item = SrsItem::new(pair, candidate.lemma.clone(), "frequency_list");
        item.stability = Some(scheduler::INITIAL_STABILITY_DAYS);
        item.difficulty = Some(scheduler::INITIAL_DIFFICULTY);
        item.confidence = Some(candidate.admission_weight);
        item.last_seen = Some(now);
        item.word_package = candidate.word_package.clone();
        next.items.push(item);
        admitted.push(candidate.lemma.clone());
    }
    (next, admitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::PosBucket;
    use crate::srs::scheduler::SECONDS_PER_DAY;
    use crate::srs::store::Rating;

    fn settings(max_active: u32, max_new: u32) -> SrsSettings {
        SrsSettings {
            max_active_items: max_active,
            max_new_items_per_day: max_new,
            ..SrsSettings::default()
        }
    }

    fn seed(lemma: &str, weight: f64) -> SeedWord {
        SeedWord {
            lemma: lemma.to_string(),
            pair: "en-ja".to_string(),
            word_package: None,
            core_rank: None,
            pos: None,
            pos_bucket: PosBucket::Noun,
            pos_weight: 1.0,
            pmw: None,
            base_weight: weight,
            admission_weight: weight,
            metadata: Default::default(),
        }
    }

    fn not_due_item(pair: &str, lemma: &str, now: i64) -> crate::srs::store::SrsItem {
        let mut i = crate::srs::store::SrsItem::new(pair, lemma, "frequency_list");
        i.next_due = Some(now + 5 * SECONDS_PER_DAY);
        i
    }

    #[test]
    fn mid_retention_halves_budget() {
        let now = 100 * SECONDS_PER_DAY;
        let store = SrsStore::default().upsert_item(not_due_item("en-ja", "猫", now));
        let mut events = Vec::new();
        for _ in 0..5 {
            events.push(SignalEvent::feedback("en-ja", "猫", Rating::Good, now));
        }
        events.push(SignalEvent::feedback("en-ja", "猫", Rating::Easy, now));
        for _ in 0..2 {
            events.push(SignalEvent::feedback("en-ja", "猫", Rating::Hard, now));
        }
        for _ in 0..2 {
            events.push(SignalEvent::feedback("en-ja", "猫", Rating::Again, now));
        }

        let decision = decide_admission(
            &store,
            &settings(10, 6),
            "en-ja",
            now,
            &events,
            &AdmissionRefreshPolicy::default(),
        );
        assert_eq!(decision.base_budget, 6);
        assert_eq!(decision.retention, Some(0.6));
        assert_eq!(decision.admission_budget, 3);
        assert_eq!(decision.reason_code, "retention_mid");
    }

    #[test]
    fn low_retention_blocks_admission() {
        let now = 100 * SECONDS_PER_DAY;
        let store = SrsStore::default().upsert_item(not_due_item("en-ja", "猫", now));
        let mut events = Vec::new();
        for i in 0..12 {
            let rating = if i % 2 == 0 { Rating::Again } else { Rating::Hard };
            events.push(SignalEvent::feedback("en-ja", "猫", rating, now));
        }

        let decision = decide_admission(
            &store,
            &settings(10, 6),
            "en-ja",
            now,
            &events,
            &AdmissionRefreshPolicy::default(),
        );
        assert_eq!(decision.retention, Some(0.0));
        assert_eq!(decision.admission_budget, 0);
        assert_eq!(decision.reason_code, "retention_low");

        let (next, admitted) =
            apply_admission(&store, "en-ja", &[seed("犬", 0.9)], decision.admission_budget, now);
        assert!(admitted.is_empty());
        assert_eq!(next, store);
    }

    #[test]
    fn small_window_degrades_to_normal() {
        let now = 0;
        let store = SrsStore::default();
        let events = vec![SignalEvent::feedback("en-ja", "猫", Rating::Again, now)];
        let decision = decide_admission(
            &store,
            &settings(10, 6),
            "en-ja",
            now,
            &events,
            &AdmissionRefreshPolicy::default(),
        );
        assert_eq!(decision.reason_code, "normal");
        assert_eq!(decision.admission_budget, 6);
        assert!(decision.notes.iter().any(|n| n.contains("small feedback")));
    }

    #[test]
    fn due_pressure_blocks_admission() {
        let now = 100 * SECONDS_PER_DAY;
        let mut store = SrsStore::default();
        // 9 of 10 slots due
        for i in 0..9 {
            let mut item = crate::srs::store::SrsItem::new("en-ja", format!("w{}", i), "frequency_list");
            item.next_due = Some(now - 1);
            store = store.upsert_item(item);
        }
        let decision = decide_admission(
            &store,
            &settings(10, 6),
            "en-ja",
            now,
            &[],
            &AdmissionRefreshPolicy::default(),
        );
        assert_eq!(decision.reason_code, "due_pressure_high");
        assert_eq!(decision.admission_budget, 0);
    }

    #[test]
    fn budget_bound_invariant() {
        let now = 0;
        let store = SrsStore::default();
        let decision = decide_admission(
            &store,
            &settings(4, 9),
            "en-ja",
            now,
            &[],
            &AdmissionRefreshPolicy::default(),
        );
        assert!(decision.admission_budget <= decision.max_new);
        assert!(decision.admission_budget <= decision.max_active - decision.due_count);
    }

    #[test]
    fn apply_admission_skips_existing_and_respects_budget() {
        let now = 0;
        let store =
            SrsStore::default().upsert_item(crate::srs::store::SrsItem::new("en-ja", "犬", "frequency_list"));
        let candidates = vec![seed("犬", 0.9), seed("猫", 0.8), seed("鳥", 0.7), seed("魚", 0.6)];
        let (next, admitted) = apply_admission(&store, "en-ja", &candidates, 2, now);
        assert_eq!(admitted, vec!["猫".to_string(), "鳥".to_string()]);
        assert_eq!(next.items.len(), 3);
        let item = next.find("en-ja", "猫").unwrap();
        assert_eq!(item.stability, Some(1.0));
        assert_eq!(item.difficulty, Some(0.5));
        assert_eq!(item.confidence, Some(0.8));
        assert_eq!(item.source_type, "frequency_list");
    }
}
