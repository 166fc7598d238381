//! Spaced-repetition core: item store, scheduler, signal log, admission
//! refresh and set planning.

pub mod admission;
pub mod planner;
pub mod scheduler;
pub mod signals;
pub mod store;

pub use admission::{AdmissionDecision, AdmissionRefreshPolicy, AdmissionThresholds};
pub use planner::{PlanStrategy, ProfileContext, SetPlan, SetPlanRequest};
pub use scheduler::{apply_feedback, select_active_items, serving_priority};
pub use signals::{FeedbackWindowStats, SignalEvent, SignalKind, SignalQueue};
pub use store::{HistoryEntry, Rating, SrsItem, SrsStore};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-pair enablement inside `SrsSettings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRule {
    pub enabled: bool,
}

/// Persisted SRS settings (`srs_settings.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrsSettings {
    pub enabled: bool,
    /// Fraction of eligible text occurrences that should be substituted.
    pub coverage_scalar: f64,
    pub max_active_items: u32,
    pub max_new_items_per_day: u32,
    /// Scales how strongly feedback moves the scheduler state.
    pub feedback_scale: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pair_rules: BTreeMap<String, PairRule>,
}

impl Default for SrsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            coverage_scalar: 1.0,
            max_active_items: 60,
            max_new_items_per_day: 12,
            feedback_scale: 1.0,
            pair_rules: BTreeMap::new(),
        }
    }
}

impl SrsSettings {
    /// Whether SRS processing is enabled for a pair. Pairs without an
    /// explicit rule inherit the global flag.
    pub fn pair_enabled(&self, pair: &str) -> bool {
        if !self.enabled {
            return false;
        }
        self.pair_rules.get(pair).map(|r| r.enabled).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_gating() {
        let mut settings = SrsSettings::default();
        assert!(settings.pair_enabled("en-ja"));
        settings
            .pair_rules
            .insert("en-de".to_string(), PairRule { enabled: false });
        assert!(!settings.pair_enabled("en-de"));
        assert!(settings.pair_enabled("en-ja"));
        settings.enabled = false;
        assert!(!settings.pair_enabled("en-ja"));
    }
}
