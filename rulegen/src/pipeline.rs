//! Staged rule-generation pipeline.
//!
//! Sources produce raw candidates; normalizers canonicalize or drop them;
//! filters gate the surviving glosses; expanders add inflected variants;
//! the scorer assigns a confidence and the threshold plus dedupe decide
//! what is emitted as `VocabRule`s. Stage counts are reported so a helper
//! job can log where candidates went.

use crate::candidate::RuleCandidate;
use crate::error::Result;
use crate::filters::{drop_inflection_artifacts, GlossFilterConfig};
use crate::score::score_candidate;
use ahash::AHashSet;
use lexishift_core::{CasePolicy, VocabRule};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

pub trait CandidateSource {
    fn name(&self) -> &str;
    fn candidates(&self) -> Result<Vec<RuleCandidate>>;
}

/// Canonicalize a candidate or drop it by returning None.
pub trait CandidateNormalizer {
    fn normalize(&self, candidate: RuleCandidate) -> Option<RuleCandidate>;
}

/// Produce derived variants of an accepted candidate.
pub trait CandidateExpander {
    fn expand(&self, candidate: &RuleCandidate) -> Vec<RuleCandidate>;
}

/// Default normalizer: trims whitespace, lowercases the source phrase and
/// strips the "to " infinitive marker dictionaries put on verb glosses.
#[derive(Default)]
pub struct GlossNormalizer;

impl CandidateNormalizer for GlossNormalizer {
    fn normalize(&self, mut candidate: RuleCandidate) -> Option<RuleCandidate> {
        let mut phrase = candidate.source_phrase.trim().to_lowercase();
        if let Some(stripped) = phrase.strip_prefix("to ") {
            phrase = stripped.to_string();
        }
        if phrase.is_empty() || candidate.replacement.trim().is_empty() {
            return None;
        }
        candidate.source_phrase = phrase;
        candidate.replacement = candidate.replacement.trim().to_string();
        Some(candidate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleGenerationConfig {
    pub language_pair: String,
    pub confidence_threshold: f64,
    pub base_priority: i32,
    pub case_policy: CasePolicy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub dedupe: bool,
}

impl RuleGenerationConfig {
    pub fn new<P: Into<String>>(language_pair: P) -> Self {
        Self {
            language_pair: language_pair.into(),
            confidence_threshold: 0.45,
            base_priority: 0,
            case_policy: CasePolicy::Match,
            tags: Vec::new(),
            dedupe: true,
        }
    }
}

/// Per-stage candidate counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub raw: usize,
    pub normalized: usize,
    pub filtered: usize,
    pub expanded: usize,
    pub scored: usize,
    pub emitted: usize,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub rules: Vec<VocabRule>,
    pub stats: GenerationStats,
}

pub struct RuleGenerationPipeline {
    config: RuleGenerationConfig,
    filter: GlossFilterConfig,
    normalizers: Vec<Box<dyn CandidateNormalizer>>,
    expanders: Vec<Box<dyn CandidateExpander>>,
}

impl RuleGenerationPipeline {
    pub fn new(config: RuleGenerationConfig, filter: GlossFilterConfig) -> Self {
        Self {
            config,
            filter,
            normalizers: vec![Box::new(GlossNormalizer)],
            expanders: Vec::new(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Box<dyn CandidateNormalizer>) -> Self {
        self.normalizers.push(normalizer);
        self
    }

    pub fn with_expander(mut self, expander: Box<dyn CandidateExpander>) -> Self {
        self.expanders.push(expander);
        self
    }

    pub fn config(&self) -> &RuleGenerationConfig {
        &self.config
    }

    pub fn run(&self, sources: &[&dyn CandidateSource]) -> Result<GenerationOutcome> {
        let mut stats = GenerationStats::default();

        let mut raw = Vec::new();
        for source in sources {
            let mut batch = source.candidates()?;
            debug!(source = source.name(), candidates = batch.len(), "collected");
            raw.append(&mut batch);
        }
        stats.raw = raw.len();

        let mut normalized = Vec::with_capacity(raw.len());
        'outer: for mut candidate in raw {
            for normalizer in &self.normalizers {
                candidate = match normalizer.normalize(candidate) {
                    Some(c) => c,
                    None => continue 'outer,
                };
            }
            normalized.push(candidate);
        }
        stats.normalized = normalized.len();

        let mut kept: Vec<RuleCandidate> = normalized
            .into_iter()
            .filter(|c| self.filter.accepts(&c.source_phrase))
            .collect();
        kept = drop_inflection_artifacts(kept);
        stats.filtered = kept.len();

        let mut variants = Vec::new();
        for candidate in &kept {
            for expander in &self.expanders {
                for variant in expander.expand(candidate) {
                    if self.filter.accepts(&variant.source_phrase) {
                        variants.push(variant);
                    }
                }
            }
        }
        stats.expanded = variants.len();
        kept.append(&mut variants);

        let mut scored: Vec<(RuleCandidate, f64)> = kept
            .into_iter()
            .map(|c| {
                let score = score_candidate(&c);
                (c, score)
            })
            .filter(|(_, score)| *score >= self.config.confidence_threshold)
            .collect();
        stats.scored = scored.len();

        if self.config.dedupe {
            let mut seen = AHashSet::new();
            scored.retain(|(c, _)| seen.insert(c.dedupe_key()));
        }

        let rules: Vec<VocabRule> = scored
            .into_iter()
            .map(|(c, score)| self.emit(c, score))
            .collect();
        stats.emitted = rules.len();

        info!(
            pair = %self.config.language_pair,
            raw = stats.raw,
            emitted = stats.emitted,
            "rule generation finished"
        );
        Ok(GenerationOutcome { rules, stats })
    }

    fn emit(&self, candidate: RuleCandidate, confidence: f64) -> VocabRule {
        let mut tags = self.config.tags.clone();
        if !tags.contains(&candidate.source_type) {
            tags.push(candidate.source_type.clone());
        }

        let mut rule = VocabRule::new(candidate.source_phrase, candidate.replacement)
            .with_priority(self.config.base_priority)
            .with_case_policy(self.config.case_policy)
            .with_tags(tags)
            .with_metadata("source", json!(candidate.source_dict))
            .with_metadata("source_type", json!(candidate.source_type))
            .with_metadata("language_pair", json!(self.config.language_pair))
            .with_metadata("confidence", json!(confidence));
        if let Some(idx) = candidate.gloss_index {
            rule = rule.with_metadata("gloss_index", json!(idx));
        }
        if let Some(forms) = &candidate.script_forms {
            rule = rule.with_metadata("script_forms", json!(forms));
        }
        if let Some(variant) = &candidate.variant {
            rule = rule.with_metadata("variant", json!(variant));
        }
        rule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::EnglishInflectionExpander;

    struct FixedSource(Vec<RuleCandidate>);

    impl CandidateSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }
        fn candidates(&self) -> Result<Vec<RuleCandidate>> {
            Ok(self.0.clone())
        }
    }

    fn candidate(source: &str, replacement: &str) -> RuleCandidate {
        let mut c = RuleCandidate::new(source, replacement, "en-ja", "jmdict", "dictionary");
        c.gloss_index = Some(0);
        c.pos = Some("n".to_string());
        c
    }

    fn pipeline() -> RuleGenerationPipeline {
        RuleGenerationPipeline::new(
            RuleGenerationConfig::new("en-ja"),
            GlossFilterConfig::default(),
        )
    }

    #[test]
    fn end_to_end_emits_rules_with_metadata() {
        let source = FixedSource(vec![candidate("Cat", "neko")]);
        let outcome = pipeline().run(&[&source]).unwrap();
        assert_eq!(outcome.rules.len(), 1);
        let rule = &outcome.rules[0];
        assert_eq!(rule.source_phrase, "cat");
        assert_eq!(rule.replacement, "neko");
        assert!(rule.tags.contains(&"dictionary".to_string()));
        assert!(rule.confidence().unwrap() > 0.0);
        assert_eq!(
            rule.metadata.get("language_pair").unwrap(),
            &json!("en-ja")
        );
    }

    #[test]
    fn infinitive_marker_stripped() {
        let mut c = candidate("to run", "hashiru");
        c.pos = Some("v".to_string());
        let source = FixedSource(vec![c]);
        let outcome = pipeline().run(&[&source]).unwrap();
        assert_eq!(outcome.rules.len(), 1);
        assert_eq!(outcome.rules[0].source_phrase, "run");
    }

    #[test]
    fn low_confidence_candidates_dropped() {
        let mut weak = candidate("thing", "mono");
        weak.gloss_index = Some(9);
        weak.pos = None; // Other bucket
        let source = FixedSource(vec![weak]);
        let mut config = RuleGenerationConfig::new("en-ja");
        config.confidence_threshold = 0.5;
        let pipeline = RuleGenerationPipeline::new(config, GlossFilterConfig::default());
        let outcome = pipeline.run(&[&source]).unwrap();
        assert!(outcome.rules.is_empty());
        assert_eq!(outcome.stats.filtered, 1);
    }

    #[test]
    fn dedupe_keeps_first() {
        let mut second = candidate("cat", "neko");
        second.gloss_index = Some(5);
        let source = FixedSource(vec![candidate("cat", "neko"), second]);
        let outcome = pipeline().run(&[&source]).unwrap();
        assert_eq!(outcome.rules.len(), 1);
        assert_eq!(outcome.rules[0].gloss_index(), Some(0));
    }

    #[test]
    fn expander_adds_inflected_variants() {
        let source = FixedSource(vec![candidate("cat", "neko")]);
        let pipeline = pipeline().with_expander(Box::new(EnglishInflectionExpander::default()));
        let outcome = pipeline.run(&[&source]).unwrap();
        assert_eq!(outcome.rules.len(), 2);
        let variant = outcome
            .rules
            .iter()
            .find(|r| r.source_phrase == "cats")
            .unwrap();
        assert_eq!(variant.variant(), Some("inflected"));
        assert_eq!(outcome.stats.expanded, 1);
    }

    #[test]
    fn unusable_glosses_never_surface() {
        let source = FixedSource(vec![
            candidate("(slang) cat", "neko"),
            candidate("cat's", "neko"),
            candidate("", "neko"),
        ]);
        let outcome = pipeline().run(&[&source]).unwrap();
        assert!(outcome.rules.is_empty());
    }
}
