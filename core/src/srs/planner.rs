//! Set planning: normalize a strategy/objective request into a concrete
//! plan payload, validating profile requirements and sizing bounds.
//!
//! Only `frequency_bootstrap` executes today; profile-driven growth and
//! adaptive refresh produce planner-only payloads until their executors
//! exist. Unknown strategies fall back to the frequency bootstrap with a
//! note rather than failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const BOOTSTRAP_TOP_N_MIN: i64 = 200;
pub const BOOTSTRAP_TOP_N_MAX: i64 = 50_000;
pub const BOOTSTRAP_TOP_N_DEFAULT: i64 = 800;
pub const INITIAL_ACTIVE_MIN: i64 = 1;
pub const INITIAL_ACTIVE_MAX: i64 = 5_000;
pub const INITIAL_ACTIVE_DEFAULT: i64 = 40;
pub const MAX_ACTIVE_HINT_MIN: i64 = 1;
pub const MAX_ACTIVE_HINT_MAX: i64 = 5_000;

const KNOWN_OBJECTIVES: &[&str] = &["balanced", "coverage", "retention"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStrategy {
    FrequencyBootstrap,
    ProfileBootstrap,
    ProfileGrowth,
    AdaptiveRefresh,
}

impl PlanStrategy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "frequency_bootstrap" => Some(PlanStrategy::FrequencyBootstrap),
            "profile_bootstrap" => Some(PlanStrategy::ProfileBootstrap),
            "profile_growth" => Some(PlanStrategy::ProfileGrowth),
            "adaptive_refresh" => Some(PlanStrategy::AdaptiveRefresh),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlanStrategy::FrequencyBootstrap => "frequency_bootstrap",
            PlanStrategy::ProfileBootstrap => "profile_bootstrap",
            PlanStrategy::ProfileGrowth => "profile_growth",
            PlanStrategy::AdaptiveRefresh => "adaptive_refresh",
        }
    }
}

/// Learner profile data required by profile-driven strategies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileContext {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proficiency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empirical_trends: Option<Value>,
}

impl ProfileContext {
    fn is_complete(&self) -> bool {
        !self.interests.is_empty() && self.proficiency.is_some() && self.empirical_trends.is_some()
    }
}

/// Raw planning request, typically arriving over the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetPlanRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_top_n: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_active_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_active_items_hint: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_context: Option<ProfileContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_summary: Option<Value>,
}

/// Normalized plan payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair: Option<String>,
    pub strategy: PlanStrategy,
    pub execution_mode: PlanStrategy,
    pub can_execute: bool,
    pub objective: String,
    pub bootstrap_top_n: i64,
    pub initial_active_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_active_items_hint: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Build a plan from a raw request.
pub fn plan_set(request: &SetPlanRequest) -> SetPlan {
    let mut notes = Vec::new();

    let requested = request.strategy.as_deref().unwrap_or("frequency_bootstrap");
    let strategy = match PlanStrategy::parse(requested) {
        Some(s) => s,
        None => {
            notes.push(format!(
                "unknown strategy '{}', falling back to frequency_bootstrap",
                requested
            ));
            PlanStrategy::FrequencyBootstrap
        }
    };

    let (execution_mode, mut can_execute) = match strategy {
        PlanStrategy::FrequencyBootstrap => (PlanStrategy::FrequencyBootstrap, true),
        PlanStrategy::ProfileBootstrap => {
            let complete = request
                .profile_context
                .as_ref()
                .map(ProfileContext::is_complete)
                .unwrap_or(false);
            if complete {
                (PlanStrategy::ProfileBootstrap, true)
            } else {
                notes.push(
                    "profile_bootstrap requires interests, proficiency and empirical_trends; \
                     falling back to frequency_bootstrap"
                        .to_string(),
                );
                (PlanStrategy::FrequencyBootstrap, true)
            }
        }
        // Planner-only until their executors land.
        PlanStrategy::ProfileGrowth => (PlanStrategy::ProfileGrowth, false),
        PlanStrategy::AdaptiveRefresh => (PlanStrategy::AdaptiveRefresh, false),
    };

    let objective = match request.objective.as_deref() {
        None => "balanced".to_string(),
        Some(o) if KNOWN_OBJECTIVES.contains(&o) => o.to_string(),
        Some(o) => {
            notes.push(format!("unknown objective '{}', using balanced", o));
            "balanced".to_string()
        }
    };

    let bootstrap_top_n = match request.set_top_n {
        None => BOOTSTRAP_TOP_N_DEFAULT,
        Some(n) if (BOOTSTRAP_TOP_N_MIN..=BOOTSTRAP_TOP_N_MAX).contains(&n) => n,
        Some(n) => {
            let clamped = n.clamp(BOOTSTRAP_TOP_N_MIN, BOOTSTRAP_TOP_N_MAX);
            notes.push(format!("set_top_n {} clamped to {}", n, clamped));
            clamped
        }
    };

    let initial_active_count = match request.initial_active_count {
        None => INITIAL_ACTIVE_DEFAULT,
        Some(n) if (INITIAL_ACTIVE_MIN..=INITIAL_ACTIVE_MAX).contains(&n) => n,
        Some(n) => {
            let clamped = n.clamp(INITIAL_ACTIVE_MIN, INITIAL_ACTIVE_MAX);
            notes.push(format!("initial_active_count {} clamped to {}", n, clamped));
            clamped
        }
    }
    .min(bootstrap_top_n);

    let max_active_items_hint = match request.max_active_items_hint {
        None => None,
        Some(n) if n <= 0 => {
            notes.push(format!("ignoring non-positive max_active_items_hint {}", n));
            None
        }
        Some(n) => Some(n.clamp(MAX_ACTIVE_HINT_MIN, MAX_ACTIVE_HINT_MAX)),
    };

    if request.pair.as_deref().map(str::is_empty).unwrap_or(true) {
        notes.push("missing language pair".to_string());
        can_execute = false;
    }

    SetPlan {
        pair: request.pair.clone().filter(|p| !p.is_empty()),
        strategy,
        execution_mode,
        can_execute,
        objective,
        bootstrap_top_n,
        initial_active_count,
        max_active_items_hint,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(pair: &str, strategy: &str) -> SetPlanRequest {
        SetPlanRequest {
            pair: Some(pair.to_string()),
            strategy: Some(strategy.to_string()),
            ..SetPlanRequest::default()
        }
    }

    #[test]
    fn frequency_bootstrap_executes_with_defaults() {
        let plan = plan_set(&request("en-ja", "frequency_bootstrap"));
        assert!(plan.can_execute);
        assert_eq!(plan.execution_mode, PlanStrategy::FrequencyBootstrap);
        assert_eq!(plan.bootstrap_top_n, 800);
        assert_eq!(plan.initial_active_count, 40);
        assert!(plan.notes.is_empty());
    }

    #[test]
    fn profile_bootstrap_falls_back_without_context() {
        let plan = plan_set(&request("en-ja", "profile_bootstrap"));
        assert!(plan.can_execute);
        assert_eq!(plan.execution_mode, PlanStrategy::FrequencyBootstrap);
        assert!(plan.notes.iter().any(|n| n.contains("profile_bootstrap")));
    }

    #[test]
    fn profile_bootstrap_with_full_context_keeps_mode() {
        let mut req = request("en-ja", "profile_bootstrap");
        req.profile_context = Some(ProfileContext {
            interests: vec!["cooking".to_string()],
            proficiency: Some("n4".to_string()),
            empirical_trends: Some(json!({"retention": 0.8})),
        });
        let plan = plan_set(&req);
        assert_eq!(plan.execution_mode, PlanStrategy::ProfileBootstrap);
        assert!(plan.can_execute);
    }

    #[test]
    fn planner_only_strategies_do_not_execute() {
        for s in ["profile_growth", "adaptive_refresh"] {
            let plan = plan_set(&request("en-ja", s));
            assert!(!plan.can_execute, "{} should be planner-only", s);
        }
    }

    #[test]
    fn unknown_strategy_falls_back_with_note() {
        let plan = plan_set(&request("en-ja", "mystery"));
        assert_eq!(plan.strategy, PlanStrategy::FrequencyBootstrap);
        assert!(plan.can_execute);
        assert!(plan.notes.iter().any(|n| n.contains("unknown strategy")));
    }

    #[test]
    fn sizing_clamps() {
        let mut req = request("en-ja", "frequency_bootstrap");
        req.set_top_n = Some(10);
        req.initial_active_count = Some(100_000);
        req.max_active_items_hint = Some(-5);
        let plan = plan_set(&req);
        assert_eq!(plan.bootstrap_top_n, 200);
        // clamped to [1, 5000] then bounded by top_n
        assert_eq!(plan.initial_active_count, 200);
        assert_eq!(plan.max_active_items_hint, None);
        assert!(plan.notes.len() >= 3);
    }

    #[test]
    fn missing_pair_blocks_execution() {
        let plan = plan_set(&SetPlanRequest::default());
        assert!(!plan.can_execute);
        assert!(plan.notes.iter().any(|n| n.contains("missing language pair")));
    }
}
