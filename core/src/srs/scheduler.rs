//! FSRS-lite scheduling.
//!
//! The simplified stability/difficulty update, not the full FSRS model.
//! All constants are frozen here and nowhere else.

use crate::srs::store::{Rating, SrsItem};

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Starting state for newly admitted items.
pub const INITIAL_STABILITY_DAYS: f64 = 1.0;
pub const INITIAL_DIFFICULTY: f64 = 0.5;

/// Difficulty drifts toward the rating target at this fixed rate.
pub const DIFFICULTY_DRIFT_RATE: f64 = 0.35;

/// Bonus factor applied to good/easy stability growth for easy items.
pub const STABILITY_EASE_BONUS: f64 = 0.4;

/// Floor so that repeated failures never collapse stability to zero.
pub const MIN_STABILITY_DAYS: f64 = 0.1;

fn difficulty_target(rating: Rating) -> f64 {
    match rating {
        Rating::Again => 0.9,
        Rating::Hard => 0.7,
        Rating::Good => 0.3,
        Rating::Easy => 0.1,
    }
}

fn stability_multiplier(rating: Rating, difficulty: f64) -> f64 {
    match rating {
        Rating::Again => 0.4,
        Rating::Hard => 0.8,
        Rating::Good => 1.3 + STABILITY_EASE_BONUS * (1.0 - difficulty),
        Rating::Easy => 1.6 + STABILITY_EASE_BONUS * (1.0 - difficulty),
    }
}

/// Apply one feedback grade, returning the updated item. History is the
/// caller's responsibility (the store appends it).
pub fn apply_feedback(item: &SrsItem, rating: Rating, now: i64) -> SrsItem {
    let mut next = item.clone();
    let difficulty = item.difficulty.unwrap_or(INITIAL_DIFFICULTY).clamp(0.0, 1.0);
    let stability = item.stability.unwrap_or(INITIAL_STABILITY_DAYS);

    let new_difficulty =
        (difficulty + DIFFICULTY_DRIFT_RATE * (difficulty_target(rating) - difficulty))
            .clamp(0.0, 1.0);
    let new_stability =
        (stability * stability_multiplier(rating, new_difficulty)).max(MIN_STABILITY_DAYS);

    next.difficulty = Some(new_difficulty);
    next.stability = Some(new_stability);
    next.next_due = Some(now + (new_stability * SECONDS_PER_DAY as f64) as i64);
    next.last_seen = Some(now);
    next
}

/// Due-derived priority used to pick which admitted item to present next.
/// Overdue items rise with the overdue delta; difficult items rise within
/// equal overdue.
pub fn serving_priority(item: &SrsItem, now: i64) -> f64 {
    let overdue_days = match item.next_due {
        Some(due) if due < now => (now - due) as f64 / SECONDS_PER_DAY as f64,
        _ => 0.0,
    };
    (1.0 + overdue_days) * (0.5 + item.difficulty.unwrap_or(INITIAL_DIFFICULTY))
}

/// Select the due subset: `next_due <= now` or no due time at all, filtered
/// to `allowed_pairs` (empty slice means all pairs), sorted by serving
/// priority descending with a deterministic id tie-break, truncated to
/// `max_active`.
pub fn select_active_items<'a>(
    items: &'a [SrsItem],
    now: i64,
    max_active: usize,
    allowed_pairs: &[String],
) -> Vec<&'a SrsItem> {
    let mut due: Vec<&SrsItem> = items
        .iter()
        .filter(|i| allowed_pairs.is_empty() || allowed_pairs.contains(&i.language_pair))
        .filter(|i| i.next_due.map(|due| due <= now).unwrap_or(true))
        .collect();
    due.sort_by(|a, b| {
        serving_priority(b, now)
            .partial_cmp(&serving_priority(a, now))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.item_id.cmp(&b.item_id))
    });
    due.truncate(max_active);
    due
}
