//! Vocabulary substitution rules and datasets.
//!
//! A `VocabRule` binds one source phrase to one replacement with a case
//! policy and priority. A `MeaningRule` binds one replacement to many source
//! phrases and expands to N `VocabRule`s when a pool is compiled. Rules carry
//! a free-form metadata bag; the typed accessors (`script_forms`,
//! `word_package`, `gloss_index`, `variant`) validate shape at the boundary
//! instead of letting untyped values leak into the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// How the replacement's letter case is derived from the matched source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CasePolicy {
    /// Mirror the source: all-uppercase source → uppercase replacement,
    /// capitalized first word → title-case, anything else → literal.
    #[default]
    Match,
    /// Insert the replacement exactly as written.
    AsIs,
    Lower,
    Upper,
    Title,
}

/// Per-script surface table for a lemma (Japanese sources).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScriptForms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kanji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kana: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub romaji: Option<String>,
}

/// Rich lexicon record bundling surface, reading, POS and provenance for
/// one lemma. Attached to rules and SRS items as they move through jobs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WordPackage {
    pub lemma: String,
    /// Language tag of the lemma itself (second segment of the pair).
    pub language_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_forms: Option<ScriptForms>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_rank: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// A single substitution rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabRule {
    pub source_phrase: String,
    pub replacement: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub case_policy: CasePolicy,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Free-form descriptive fields; use the typed accessors below.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

fn default_true() -> bool {
    true
}

impl VocabRule {
    pub fn new<S: Into<String>, R: Into<String>>(source_phrase: S, replacement: R) -> Self {
        Self {
            source_phrase: source_phrase.into(),
            replacement: replacement.into(),
            priority: 0,
            case_policy: CasePolicy::default(),
            enabled: true,
            tags: Vec::new(),
            metadata: BTreeMap::new(),
            created_at: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_case_policy(mut self, policy: CasePolicy) -> Self {
        self.case_policy = policy;
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Typed extraction of `metadata.script_forms`. Malformed shapes read
    /// as absent.
    pub fn script_forms(&self) -> Option<ScriptForms> {
        self.metadata
            .get("script_forms")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Typed extraction of `metadata.word_package`.
    pub fn word_package(&self) -> Option<WordPackage> {
        self.metadata
            .get("word_package")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Position of the originating gloss within its dictionary entry.
    pub fn gloss_index(&self) -> Option<u64> {
        self.metadata.get("gloss_index").and_then(Value::as_u64)
    }

    /// "inflected" when the rule came out of a variant expander.
    pub fn variant(&self) -> Option<&str> {
        self.metadata.get("variant").and_then(Value::as_str)
    }

    /// Confidence recorded by the rule-generation scorer, if any.
    pub fn confidence(&self) -> Option<f64> {
        self.metadata.get("confidence").and_then(Value::as_f64)
    }
}

/// One replacement bound to many source phrases; expands at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeaningRule {
    pub replacement: String,
    pub sources: Vec<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub case_policy: CasePolicy,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl MeaningRule {
    /// Expand into one `VocabRule` per source phrase.
    pub fn expand(&self) -> Vec<VocabRule> {
        self.sources
            .iter()
            .map(|src| VocabRule {
                source_phrase: src.clone(),
                replacement: self.replacement.clone(),
                priority: self.priority,
                case_policy: self.case_policy,
                enabled: self.enabled,
                tags: self.tags.clone(),
                metadata: BTreeMap::new(),
                created_at: None,
            })
            .collect()
    }
}

/// Dataset-level toggles consumed by the replacer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tags whose rules are skipped at compile time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_tags: Vec<String>,
}

impl Default for VocabSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled_tags: Vec::new(),
        }
    }
}

/// A complete, persistable rule collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VocabDataset {
    #[serde(default)]
    pub rules: Vec<VocabRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meaning_rules: Vec<MeaningRule>,
    #[serde(default, skip_serializing_if = "is_default_settings")]
    pub settings: VocabSettings,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn is_default_settings(s: &VocabSettings) -> bool {
    *s == VocabSettings::default()
}

fn default_version() -> u32 {
    1
}

impl VocabDataset {
    pub fn new(rules: Vec<VocabRule>) -> Self {
        Self {
            rules,
            meaning_rules: Vec::new(),
            settings: VocabSettings::default(),
            version: 1,
        }
    }

    /// All rules eligible for compilation: explicit rules plus expanded
    /// meaning rules, with disabled rules and disabled tags dropped.
    pub fn effective_rules(&self) -> Vec<VocabRule> {
        let mut out: Vec<VocabRule> = Vec::with_capacity(self.rules.len());
        let expanded: Vec<VocabRule> = self
            .meaning_rules
            .iter()
            .flat_map(|m| m.expand())
            .collect();
        for rule in self.rules.iter().cloned().chain(expanded) {
            if !rule.enabled {
                continue;
            }
            if rule
                .tags
                .iter()
                .any(|t| self.settings.disabled_tags.contains(t))
            {
                continue;
            }
            out.push(rule);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn meaning_rule_expands_per_source() {
        let m = MeaningRule {
            replacement: "Haus".to_string(),
            sources: vec!["house".to_string(), "home".to_string()],
            priority: 2,
            case_policy: CasePolicy::Match,
            enabled: true,
            tags: vec!["dict".to_string()],
        };
        let rules = m.expand();
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(|r| r.replacement == "Haus"));
        assert!(rules.iter().all(|r| r.priority == 2));
    }

    #[test]
    fn typed_metadata_extraction() {
        let rule = VocabRule::new("neko", "cat")
            .with_metadata(
                "script_forms",
                json!({"kanji": "猫", "kana": "ねこ", "romaji": "neko"}),
            )
            .with_metadata("gloss_index", json!(0))
            .with_metadata("variant", json!("inflected"));
        let forms = rule.script_forms().expect("script forms");
        assert_eq!(forms.kanji.as_deref(), Some("猫"));
        assert_eq!(rule.gloss_index(), Some(0));
        assert_eq!(rule.variant(), Some("inflected"));
    }

    #[test]
    fn malformed_metadata_reads_as_absent() {
        let rule = VocabRule::new("a", "b").with_metadata("script_forms", json!("not a map"));
        assert!(rule.script_forms().is_none());
    }

    #[test]
    fn effective_rules_skip_disabled_and_tagged() {
        let mut dataset = VocabDataset::new(vec![
            VocabRule::new("a", "x"),
            VocabRule {
                enabled: false,
                ..VocabRule::new("b", "y")
            },
            VocabRule::new("c", "z").with_tags(["experimental"]),
        ]);
        dataset.settings.disabled_tags = vec!["experimental".to_string()];
        let eff = dataset.effective_rules();
        assert_eq!(eff.len(), 1);
        assert_eq!(eff[0].source_phrase, "a");
    }

    #[test]
    fn dataset_roundtrip() {
        let dataset = VocabDataset::new(vec![VocabRule::new("new york", "gotham")]);
        let text = serde_json::to_string(&dataset).unwrap();
        let back: VocabDataset = serde_json::from_str(&text).unwrap();
        assert_eq!(dataset, back);
    }
}
