//! Candidate confidence scoring.
//!
//! A weighted blend of dictionary sense position, corpus frequency and
//! part of speech, discounted for generated variants and multiword
//! phrases. An embedding similarity, when a vector pack supplied one,
//! nudges the score in either direction around its 0.5 midpoint.

use crate::candidate::RuleCandidate;
use lexishift_core::PosBucket;

pub const W_DICT: f64 = 0.6;
pub const W_FREQ: f64 = 0.2;
pub const W_POS: f64 = 0.1;
pub const W_VARIANT: f64 = 0.1;
pub const W_PHRASE: f64 = 0.1;
pub const W_EMBEDDING: f64 = 0.2;

/// Sense-position decay: the first gloss of an entry scores 1.0, later
/// glosses step down to a 0.5 floor.
fn dictionary_signal(candidate: &RuleCandidate) -> f64 {
    match candidate.gloss_index {
        Some(idx) => (1.0 - 0.1 * idx as f64).max(0.5),
        None => 1.0,
    }
}

/// Confidence in [0, 1] for one candidate.
pub fn score_candidate(candidate: &RuleCandidate) -> f64 {
    let dict = dictionary_signal(candidate);
    let freq = candidate.frequency_weight.unwrap_or(0.0);
    let pos = candidate
        .pos
        .as_deref()
        .map(PosBucket::from_raw_tag)
        .unwrap_or(PosBucket::Other)
        .weight();
    let variant_penalty = if candidate.variant.is_some() { 1.0 } else { 0.0 };
    let phrase_penalty = if candidate.is_multiword() { 1.0 } else { 0.0 };

    let mut score = W_DICT * dict + W_FREQ * freq + W_POS * pos
        - W_VARIANT * variant_penalty
        - W_PHRASE * phrase_penalty;
    if let Some(similarity) = candidate.embedding_similarity {
        score += (similarity.clamp(0.0, 1.0) - 0.5) * W_EMBEDDING;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(source: &str) -> RuleCandidate {
        let mut c = RuleCandidate::new(source, "neko", "en-ja", "jmdict", "dictionary");
        c.gloss_index = Some(0);
        c.pos = Some("n".to_string());
        c
    }

    #[test]
    fn first_gloss_noun_scores_high() {
        let score = score_candidate(&candidate("cat"));
        assert!((score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn later_glosses_score_lower() {
        let mut late = candidate("shamisen");
        late.gloss_index = Some(3);
        assert!(score_candidate(&late) < score_candidate(&candidate("cat")));
        // decay floors at 0.5
        let mut very_late = candidate("x-ray");
        very_late.gloss_index = Some(20);
        assert!(score_candidate(&very_late) >= W_DICT * 0.5);
    }

    #[test]
    fn penalties_subtract() {
        let plain = score_candidate(&candidate("cat"));

        let mut variant = candidate("cats");
        variant.variant = Some("inflected".to_string());
        assert!((score_candidate(&variant) - (plain - W_VARIANT)).abs() < 1e-9);

        let multi = candidate("black cat");
        assert!((score_candidate(&multi) - (plain - W_PHRASE)).abs() < 1e-9);
    }

    #[test]
    fn frequency_raises_score() {
        let mut frequent = candidate("cat");
        frequent.frequency_weight = Some(1.0);
        assert!(score_candidate(&frequent) > score_candidate(&candidate("cat")));
    }

    #[test]
    fn embedding_is_centered_on_half() {
        let base = score_candidate(&candidate("cat"));
        let mut neutral = candidate("cat");
        neutral.embedding_similarity = Some(0.5);
        assert!((score_candidate(&neutral) - base).abs() < 1e-9);

        let mut related = candidate("cat");
        related.embedding_similarity = Some(1.0);
        assert!(score_candidate(&related) > base);

        let mut unrelated = candidate("cat");
        unrelated.embedding_similarity = Some(0.0);
        assert!(score_candidate(&unrelated) < base);
    }

    #[test]
    fn score_is_clamped() {
        let mut best = candidate("cat");
        best.frequency_weight = Some(1.0);
        best.embedding_similarity = Some(1.0);
        let score = score_candidate(&best);
        assert!((0.0..=1.0).contains(&score));
    }
}
