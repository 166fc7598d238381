//! Helper engine: one facade over the data directory and every job the
//! native host or CLI can run.
//!
//! Jobs are load → compute → persist: each one reads the JSON artifacts it
//! needs, threads new values through the core's functional mutations and
//! writes the results atomically before returning a JSON payload. Nothing
//! is cached between jobs, so concurrent helpers only race on the atomic
//! renames.

use lexishift_core::persist::{
    data_root, load_json, load_json_or_init, save_json, AppSettings, HelperStatus, Profile,
    ProfilePaths,
};
use lexishift_core::srs::admission::{apply_admission, decide_admission, AdmissionRefreshPolicy};
use lexishift_core::srs::planner::{plan_set, SetPlanRequest};
use lexishift_core::srs::scheduler::select_active_items;
use lexishift_core::srs::signals::{feedback_window, SignalEvent, SignalQueue};
use lexishift_core::srs::store::{Rating, SrsStore};
use lexishift_core::srs::SrsSettings;
use lexishift_core::{
    build_seed_candidates, seed::load_stopwords, CoreError, FrequencyStore, LemmaProvider,
    SeedWord, SelectorConfig, VocabDataset,
};
use lexishift_rulegen::{run_rulegen, JmdictIndex, RulegenError, RulegenRequest};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

pub const HELPER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub type JobResult = std::result::Result<Value, RulegenError>;

/// What a language pair supports and which packs it needs.
pub struct PairCapability {
    pub pair: &'static str,
    /// Dictionary file expected under `language_packs/`.
    pub dictionary_file: &'static str,
    /// Frequency pack expected under `frequency_packs/`, when one ships.
    pub frequency_file: Option<&'static str>,
    pub srs_selectable: bool,
    /// Seed selection filters against the JMDict index when available.
    pub jmdict_seed_filter: bool,
}

pub const PAIR_CAPABILITIES: &[PairCapability] = &[
    PairCapability {
        pair: "en-ja",
        dictionary_file: "jmdict.xml",
        frequency_file: Some("ja_freq.db"),
        srs_selectable: true,
        jmdict_seed_filter: true,
    },
    PairCapability {
        pair: "en-de",
        dictionary_file: "deu-eng.tei",
        frequency_file: Some("de_freq.db"),
        srs_selectable: true,
        jmdict_seed_filter: false,
    },
    PairCapability {
        pair: "de-en",
        dictionary_file: "eng-deu.tei",
        frequency_file: Some("en_freq.db"),
        srs_selectable: true,
        jmdict_seed_filter: false,
    },
    PairCapability {
        pair: "en-es",
        dictionary_file: "spa-eng.tei",
        frequency_file: Some("es_freq.db"),
        srs_selectable: true,
        jmdict_seed_filter: false,
    },
    PairCapability {
        pair: "es-en",
        dictionary_file: "eng-spa.tei",
        frequency_file: Some("en_freq.db"),
        srs_selectable: true,
        jmdict_seed_filter: false,
    },
];

pub fn capability(pair: &str) -> Option<&'static PairCapability> {
    PAIR_CAPABILITIES.iter().find(|c| c.pair == pair)
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub struct HelperEngine {
    data_root: PathBuf,
    profile_id: String,
    paths: ProfilePaths,
}

impl HelperEngine {
    /// Engine over the platform data root and the active (or default)
    /// profile.
    pub fn new(profile_id: Option<String>) -> lexishift_core::Result<Self> {
        Self::with_root(data_root(), profile_id.as_deref().unwrap_or("default"))
    }

    /// Engine rooted at an explicit directory.
    pub fn with_root<P: Into<PathBuf>>(root: P, profile_id: &str) -> lexishift_core::Result<Self> {
        let data_root = root.into();
        let engine = Self {
            paths: ProfilePaths::new(&data_root, profile_id),
            profile_id: profile_id.to_string(),
            data_root,
        };
        engine.ensure_layout()?;
        Ok(engine)
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn paths(&self) -> &ProfilePaths {
        &self.paths
    }

    pub fn language_packs_dir(&self) -> PathBuf {
        self.data_root.join("language_packs")
    }

    pub fn frequency_packs_dir(&self) -> PathBuf {
        self.data_root.join("frequency_packs")
    }

    pub fn embeddings_dir(&self) -> PathBuf {
        self.data_root.join("embeddings")
    }

    fn ensure_layout(&self) -> lexishift_core::Result<()> {
        for dir in [
            self.language_packs_dir(),
            self.frequency_packs_dir(),
            self.embeddings_dir(),
            self.data_root.join("helper"),
            self.paths.srs_dir.clone(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        let mut settings: AppSettings = load_json_or_init(self.settings_path())?;
        if settings.profiles.is_empty() {
            let ruleset = self.paths.ruleset("en-ja");
            settings.profiles.push(Profile {
                profile_id: self.profile_id.clone(),
                name: "Default".to_string(),
                rulesets: vec![ruleset.clone()],
                active_ruleset: Some(ruleset),
                ..Profile::default()
            });
            settings.active_profile_id = Some(self.profile_id.clone());
            save_json(self.settings_path(), &settings)?;
        }
        Ok(())
    }

    fn settings_path(&self) -> PathBuf {
        self.data_root.join("settings.json")
    }

    fn require_capability(&self, pair: &str) -> std::result::Result<&'static PairCapability, RulegenError> {
        capability(pair).ok_or_else(|| CoreError::PairUnsupported(pair.to_string()).into())
    }

    fn load_store(&self) -> lexishift_core::Result<SrsStore> {
        load_json_or_init(self.paths.store())
    }

    fn load_srs_settings(&self) -> lexishift_core::Result<SrsSettings> {
        load_json_or_init(self.paths.settings())
    }

    fn load_queue(&self) -> lexishift_core::Result<SignalQueue> {
        load_json_or_init(self.paths.signal_queue())
    }

    fn write_status(
        &self,
        pair: Option<&str>,
        rule_count: u64,
        target_count: u64,
        error: Option<String>,
    ) {
        let status = HelperStatus {
            version: 1,
            helper_version: HELPER_VERSION.to_string(),
            last_run_at: Some(now_unix()),
            last_error: error,
            last_pair: pair.map(|p| p.to_string()),
            last_rule_count: rule_count,
            last_target_count: target_count,
        };
        if let Err(e) = save_json(self.paths.status(), &status) {
            warn!(error = %e, "failed to write status file");
        }
    }

    /// Run dictionary rule generation for a pair, writing the ruleset,
    /// snapshot and status files.
    pub fn run_rulegen_job(
        &self,
        pair: &str,
        dictionary: Option<PathBuf>,
        frequency_db: Option<PathBuf>,
    ) -> JobResult {
        let result = self.run_rulegen_inner(pair, dictionary, frequency_db);
        if let Err(e) = &result {
            self.write_status(Some(pair), 0, 0, Some(e.to_string()));
        }
        result
    }

    fn run_rulegen_inner(
        &self,
        pair: &str,
        dictionary: Option<PathBuf>,
        frequency_db: Option<PathBuf>,
    ) -> JobResult {
        let cap = self.require_capability(pair)?;
        let dictionary =
            dictionary.unwrap_or_else(|| self.language_packs_dir().join(cap.dictionary_file));
        let frequency_db = frequency_db.or_else(|| {
            cap.frequency_file
                .map(|f| self.frequency_packs_dir().join(f))
                .filter(|p| p.exists())
        });

        let mut request = RulegenRequest::new(pair, dictionary);
        request.frequency_db = frequency_db;
        let outcome = run_rulegen(&request)?;

        let dataset = VocabDataset::new(outcome.rules.clone());
        let ruleset_path = self.paths.ruleset(pair);
        save_json(&ruleset_path, &dataset).map_err(RulegenError::from)?;

        let snapshot = build_snapshot(pair, &dataset);
        let snapshot_path = self.paths.snapshot(pair);
        save_json(&snapshot_path, &snapshot).map_err(RulegenError::from)?;

        let target_count = snapshot["stats"]["target_count"].as_u64().unwrap_or(0);
        self.write_status(Some(pair), outcome.rules.len() as u64, target_count, None);
        info!(pair, rules = outcome.rules.len(), "rulegen job finished");

        Ok(json!({
            "pair": pair,
            "rule_count": outcome.rules.len(),
            "target_count": target_count,
            "ruleset_path": ruleset_path,
            "snapshot_path": snapshot_path,
            "stats": outcome.stats,
        }))
    }

    fn seed_candidates(
        &self,
        pair: &str,
        cap: &PairCapability,
        top_n: usize,
    ) -> std::result::Result<Vec<SeedWord>, RulegenError> {
        let language_tag = pair.split('-').nth(1).unwrap_or(pair).to_string();
        let freq_file = cap.frequency_file.ok_or_else(|| {
            CoreError::missing(self.frequency_packs_dir().join("frequency pack"))
        })?;
        let store = FrequencyStore::open(self.frequency_packs_dir().join(freq_file), None)?;

        let stopword_path = self
            .frequency_packs_dir()
            .join(format!("stopwords_{}.json", language_tag));
        let stopwords = if stopword_path.exists() {
            load_stopwords(&stopword_path)?
        } else {
            Default::default()
        };

        let mut config = SelectorConfig::new(pair, language_tag, top_n);
        let jmdict_path = self.language_packs_dir().join("jmdict.xml");
        let index = if cap.jmdict_seed_filter && jmdict_path.exists() {
            config.require_dictionary = true;
            config.provider_name = Some("jmdict".to_string());
            Some(JmdictIndex::load(&jmdict_path)?)
        } else {
            None
        };
        let provider = index.as_ref().map(|i| i as &dyn LemmaProvider);
        Ok(build_seed_candidates(&store, &config, &stopwords, provider)?)
    }

    /// Bootstrap a learning set: plan, select seed candidates and admit the
    /// initial active batch.
    pub fn initialize_srs_set(
        &self,
        pair: &str,
        top_n: Option<i64>,
        initial_active: Option<i64>,
    ) -> JobResult {
        let cap = self.require_capability(pair)?;
        let settings = self.load_srs_settings()?;
        if !settings.pair_enabled(pair) || !cap.srs_selectable {
            return Ok(json!({"pair": pair, "skipped": true, "reason": "pair_disabled"}));
        }

        let plan = plan_set(&SetPlanRequest {
            pair: Some(pair.to_string()),
            set_top_n: top_n,
            initial_active_count: initial_active,
            ..SetPlanRequest::default()
        });

        let seeds = self.seed_candidates(pair, cap, plan.bootstrap_top_n as usize)?;
        let store = self.load_store()?;
        let now = now_unix();
        let (next, admitted) =
            apply_admission(&store, pair, &seeds, plan.initial_active_count as usize, now);
        save_json(self.paths.store(), &next).map_err(RulegenError::from)?;
        info!(pair, admitted = admitted.len(), "initialized learning set");

        Ok(json!({
            "pair": pair,
            "candidate_count": seeds.len(),
            "admitted": admitted,
            "admitted_count": admitted.len(),
            "plan": plan,
        }))
    }

    /// Plan a set change without executing it.
    pub fn plan_srs_set(&self, request: Value) -> JobResult {
        let request: SetPlanRequest = serde_json::from_value(request)
            .map_err(|e| CoreError::malformed("srs_plan_set", e.to_string()))?;
        let plan = plan_set(&request);
        Ok(serde_json::to_value(plan).map_err(CoreError::from)?)
    }

    /// Admission refresh: decide a budget from the live signals and admit
    /// new candidates under it.
    pub fn refresh_srs_set(&self, pair: &str) -> JobResult {
        let cap = self.require_capability(pair)?;
        let settings = self.load_srs_settings()?;
        if !settings.pair_enabled(pair) || !cap.srs_selectable {
            return Ok(json!({"pair": pair, "skipped": true, "reason": "pair_disabled"}));
        }

        let store = self.load_store()?;
        let queue = self.load_queue()?;
        let now = now_unix();
        let policy = AdmissionRefreshPolicy::default();
        let decision = decide_admission(&store, &settings, pair, now, &queue.events, &policy);

        let admitted = if decision.admission_budget > 0 {
            let seeds = self.seed_candidates(pair, cap, 800)?;
            let (next, admitted) =
                apply_admission(&store, pair, &seeds, decision.admission_budget, now);
            save_json(self.paths.store(), &next).map_err(RulegenError::from)?;
            admitted
        } else {
            Vec::new()
        };

        Ok(json!({
            "pair": pair,
            "decision": decision,
            "admitted": admitted,
        }))
    }

    /// Grade an admitted item and log the signal.
    pub fn record_feedback(&self, pair: &str, lemma: &str, rating: &str) -> JobResult {
        self.require_capability(pair)?;
        let rating = Rating::parse(rating).ok_or_else(|| {
            CoreError::malformed("record_feedback", format!("unknown rating {}", rating))
        })?;
        let settings = self.load_srs_settings()?;
        if !settings.pair_enabled(pair) {
            return Ok(json!({"pair": pair, "skipped": true, "reason": "pair_disabled"}));
        }

        let now = now_unix();
        let store = self.load_store()?;
        let known = store.find(pair, lemma).is_some();
        let next = store.record_feedback(pair, lemma, rating, now, true);
        save_json(self.paths.store(), &next).map_err(RulegenError::from)?;

        let queue = self
            .load_queue()?
            .append(SignalEvent::feedback(pair, lemma, rating, now));
        save_json(self.paths.signal_queue(), &queue).map_err(RulegenError::from)?;

        let item = next.find(pair, lemma);
        Ok(json!({
            "pair": pair,
            "lemma": lemma,
            "known_item": known,
            "next_due": item.and_then(|i| i.next_due),
            "stability": item.and_then(|i| i.stability),
            "difficulty": item.and_then(|i| i.difficulty),
        }))
    }

    /// Log a passive exposure, creating the item if needed.
    pub fn record_exposure(&self, pair: &str, lemma: &str) -> JobResult {
        self.require_capability(pair)?;
        let settings = self.load_srs_settings()?;
        if !settings.pair_enabled(pair) {
            return Ok(json!({"pair": pair, "skipped": true, "reason": "pair_disabled"}));
        }

        let now = now_unix();
        let next = self.load_store()?.record_exposure(pair, lemma, now, true);
        save_json(self.paths.store(), &next).map_err(RulegenError::from)?;

        let queue = self
            .load_queue()?
            .append(SignalEvent::exposure(pair, lemma, now));
        save_json(self.paths.signal_queue(), &queue).map_err(RulegenError::from)?;

        let exposures = next.find(pair, lemma).map(|i| i.exposures).unwrap_or(0);
        Ok(json!({"pair": pair, "lemma": lemma, "exposures": exposures}))
    }

    /// Drop learning state for one pair, or everything when `pair` is None.
    /// Ruleset and snapshot files for the pair are removed too.
    pub fn reset_srs_data(&self, pair: Option<&str>) -> JobResult {
        let store = self.load_store()?;
        let queue = self.load_queue()?;
        let (next_store, next_queue, removed) = match pair {
            Some(p) => {
                self.require_capability(p)?;
                let mut s = store.clone();
                let before = s.items.len();
                s.items.retain(|i| i.language_pair != p);
                let removed = before - s.items.len();
                let mut q = queue.clone();
                q.events.retain(|e| e.pair != p);
                for path in [self.paths.ruleset(p), self.paths.snapshot(p)] {
                    if path.exists() {
                        let _ = std::fs::remove_file(path);
                    }
                }
                (s, q, removed)
            }
            None => (SrsStore::default(), SignalQueue::default(), store.items.len()),
        };
        save_json(self.paths.store(), &next_store).map_err(RulegenError::from)?;
        save_json(self.paths.signal_queue(), &next_queue).map_err(RulegenError::from)?;
        info!(pair = pair.unwrap_or("*"), removed, "reset learning data");
        Ok(json!({"removed_items": removed}))
    }

    /// Read-only runtime picture for one pair: counts, window stats and a
    /// dry-run admission decision.
    pub fn srs_diagnostics(&self, pair: &str) -> JobResult {
        self.require_capability(pair)?;
        let store = self.load_store()?;
        let settings = self.load_srs_settings()?;
        let queue = self.load_queue()?;
        let now = now_unix();
        let policy = AdmissionRefreshPolicy::default();

        let item_count = store.items_for_pair(pair).count();
        let allowed = [pair.to_string()];
        let due = select_active_items(
            &store.items,
            now,
            settings.max_active_items as usize,
            &allowed,
        );
        let window = feedback_window(&queue.events, pair, policy.feedback_window_size);
        let decision = decide_admission(&store, &settings, pair, now, &queue.events, &policy);

        Ok(json!({
            "pair": pair,
            "item_count": item_count,
            "due_count": due.len(),
            "signal_count": queue.len(),
            "window": window,
            "settings": settings,
            "decision": decision,
        }))
    }

    pub fn load_ruleset(&self, pair: &str) -> JobResult {
        self.require_capability(pair)?;
        let dataset: VocabDataset = load_json(self.paths.ruleset(pair))?;
        Ok(serde_json::to_value(dataset).map_err(CoreError::from)?)
    }

    pub fn load_snapshot(&self, pair: &str) -> JobResult {
        self.require_capability(pair)?;
        Ok(load_json(self.paths.snapshot(pair))?)
    }

    /// Status file contents plus live identity fields.
    pub fn status(&self) -> JobResult {
        let status: HelperStatus = match load_json(self.paths.status()) {
            Ok(s) => s,
            Err(CoreError::InputMissing { .. }) => HelperStatus::default(),
            Err(e) => return Err(e.into()),
        };
        let mut value = serde_json::to_value(status).map_err(CoreError::from)?;
        if let Some(map) = value.as_object_mut() {
            map.insert("helper_version".to_string(), json!(HELPER_VERSION));
            map.insert("data_root".to_string(), json!(self.data_root));
            map.insert("profile_id".to_string(), json!(self.profile_id));
        }
        Ok(value)
    }

    /// Profiles from `settings.json`.
    pub fn profiles(&self) -> JobResult {
        let settings: AppSettings = load_json_or_init(self.settings_path())?;
        Ok(serde_json::to_value(settings).map_err(CoreError::from)?)
    }
}

/// Snapshot of a generated ruleset grouped by replacement target.
fn build_snapshot(pair: &str, dataset: &VocabDataset) -> Value {
    let mut targets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for rule in &dataset.rules {
        targets
            .entry(rule.replacement.clone())
            .or_default()
            .push(rule.source_phrase.clone());
    }
    let source_count: usize = targets.values().map(|v| v.len()).sum();
    let target_list: Vec<Value> = targets
        .iter()
        .map(|(lemma, sources)| json!({"lemma": lemma, "sources": sources}))
        .collect();
    json!({
        "version": 1,
        "generated_at": now_unix(),
        "pair": pair,
        "targets": target_list,
        "stats": {
            "target_count": targets.len(),
            "rule_count": dataset.rules.len(),
            "source_count": source_count,
        },
    })
}
