//! Canonical JSON persistence, profiles, settings and platform layout.
//!
//! Every persisted artifact is UTF-8 JSON with sorted keys, 2-space indent
//! and null/empty fields trimmed on write. Writes are atomic: a temp file
//! in the target directory followed by a rename, so readers only ever see
//! a complete old or new file.

use crate::error::{CoreError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment override for the data root; used by tests and portable
/// installs.
pub const DATA_DIR_ENV: &str = "LEXISHIFT_DATA_DIR";

/// Recursively drop null values and empty strings/arrays/objects.
fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) => {
            let pruned: Vec<Value> = items.into_iter().filter_map(prune).collect();
            if pruned.is_empty() {
                None
            } else {
                Some(Value::Array(pruned))
            }
        }
        Value::Object(map) => {
            let mut pruned = Map::new();
            for (k, v) in map {
                if let Some(v) = prune(v) {
                    pruned.insert(k, v);
                }
            }
            if pruned.is_empty() {
                None
            } else {
                Some(Value::Object(pruned))
            }
        }
        other => Some(other),
    }
}

/// Serialize to the canonical on-disk form: sorted keys, 2-space indent,
/// trimmed of null/empty fields, trailing newline.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    // Round-trip through Value: serde_json's default map is a BTreeMap, so
    // keys come out sorted.
    let value = serde_json::to_value(value)?;
    let pruned = prune(value).unwrap_or(Value::Object(Map::new()));
    let mut text = serde_json::to_string_pretty(&pruned)?;
    text.push('\n');
    Ok(text)
}

/// Atomically write `value` as canonical JSON.
pub fn save_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let text = canonical_json(value)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| CoreError::Io(e.error))?;
    debug!(path = %path.display(), "wrote json");
    Ok(())
}

/// Load JSON, distinguishing a missing file from a malformed one.
pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CoreError::missing(path));
    }
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| CoreError::malformed(path, e.to_string()))
}

/// First-run semantics: a missing file yields the default, which is
/// persisted so later readers see it.
pub fn load_json_or_init<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned + Serialize + Default,
    P: AsRef<Path>,
{
    match load_json(&path) {
        Ok(value) => Ok(value),
        Err(CoreError::InputMissing { .. }) => {
            let value = T::default();
            save_json(&path, &value)?;
            Ok(value)
        }
        Err(e) => Err(e),
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// Platform data root:
/// macOS `~/Library/Application Support/LexiShift/LexiShift`,
/// Windows `%APPDATA%/LexiShift/LexiShift`,
/// Linux `~/.local/share/LexiShift/LexiShift`.
/// `LEXISHIFT_DATA_DIR` overrides on every platform.
pub fn data_root() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    if cfg!(target_os = "macos") {
        home.join("Library")
            .join("Application Support")
            .join("LexiShift")
            .join("LexiShift")
    } else if cfg!(target_os = "windows") {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("AppData").join("Roaming"))
            .join("LexiShift")
            .join("LexiShift")
    } else {
        home.join(".local")
            .join("share")
            .join("LexiShift")
            .join("LexiShift")
    }
}

/// Well-known locations under one profile's directory.
#[derive(Debug, Clone)]
pub struct ProfilePaths {
    pub profile_dir: PathBuf,
    pub srs_dir: PathBuf,
}

impl ProfilePaths {
    pub fn new(data_root: &Path, profile_id: &str) -> Self {
        let profile_dir = data_root.join("profiles").join(profile_id);
        let srs_dir = profile_dir.join("srs");
        Self {
            profile_dir,
            srs_dir,
        }
    }

    pub fn store(&self) -> PathBuf {
        self.srs_dir.join("srs_store.json")
    }

    pub fn settings(&self) -> PathBuf {
        self.srs_dir.join("srs_settings.json")
    }

    pub fn status(&self) -> PathBuf {
        self.srs_dir.join("srs_status.json")
    }

    pub fn signal_queue(&self) -> PathBuf {
        self.srs_dir.join("srs_signal_queue.json")
    }

    pub fn ruleset(&self, pair: &str) -> PathBuf {
        self.srs_dir.join(format!("srs_ruleset_{}.json", pair))
    }

    pub fn snapshot(&self, pair: &str) -> PathBuf {
        self.srs_dir
            .join(format!("srs_rulegen_snapshot_{}.json", pair))
    }
}

/// One user profile entry in `settings.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub profile_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rulesets: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_ruleset: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Profile {
    /// Enforce the profile invariants and normalize paths to absolute form
    /// under `base_dir`.
    pub fn validate_and_normalize(&mut self, base_dir: &Path) -> Result<()> {
        if self.profile_id.trim().is_empty() {
            return Err(CoreError::malformed(
                "settings.json",
                "profile_id must be non-empty",
            ));
        }
        if self.rulesets.is_empty() {
            return Err(CoreError::malformed(
                "settings.json",
                format!("profile {} has no rulesets", self.profile_id),
            ));
        }
        let normalize = |p: &PathBuf| -> PathBuf {
            let expanded = expand_tilde(p);
            if expanded.is_absolute() {
                expanded
            } else {
                base_dir.join(expanded)
            }
        };
        self.rulesets = self.rulesets.iter().map(|p| normalize(p)).collect();
        self.dataset_path = self.dataset_path.as_ref().map(|p| normalize(p));
        self.active_ruleset = self.active_ruleset.as_ref().map(|p| normalize(p));
        let active = match &self.active_ruleset {
            Some(a) => a.clone(),
            // default to the first ruleset
            None => {
                self.active_ruleset = Some(self.rulesets[0].clone());
                return Ok(());
            }
        };
        if !self.rulesets.contains(&active) {
            return Err(CoreError::malformed(
                "settings.json",
                format!(
                    "profile {}: active_ruleset not in rulesets",
                    self.profile_id
                ),
            ));
        }
        Ok(())
    }
}

/// Top-level `settings.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_profile_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_export: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub synonyms: BTreeMap<String, String>,
    pub version: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            profiles: Vec::new(),
            active_profile_id: None,
            import_export: None,
            synonyms: BTreeMap::new(),
            version: 1,
        }
    }
}

impl AppSettings {
    pub fn active_profile(&self) -> Option<&Profile> {
        let id = self.active_profile_id.as_deref()?;
        self.profiles.iter().find(|p| p.profile_id == id)
    }

    /// Validate profile invariants: unique ids, per-profile checks.
    pub fn validate_and_normalize(&mut self, base_dir: &Path) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for profile in &mut self.profiles {
            profile.validate_and_normalize(base_dir)?;
            if !seen.insert(profile.profile_id.clone()) {
                return Err(CoreError::malformed(
                    "settings.json",
                    format!("duplicate profile_id {}", profile.profile_id),
                ));
            }
        }
        Ok(())
    }
}

/// `srs_status.json`: the helper's last-run record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperStatus {
    pub version: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub helper_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pair: Option<String>,
    #[serde(default)]
    pub last_rule_count: u64,
    #[serde(default)]
    pub last_target_count: u64,
}

impl Default for HelperStatus {
    fn default() -> Self {
        Self {
            version: 1,
            helper_version: String::new(),
            last_run_at: None,
            last_error: None,
            last_pair: None,
            last_rule_count: 0,
            last_target_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srs::SrsSettings;
    use tempfile::TempDir;

    #[test]
    fn canonical_json_sorts_and_trims() {
        #[derive(Serialize)]
        struct Sample {
            zebra: u32,
            apple: Option<String>,
            middle: String,
        }
        let text = canonical_json(&Sample {
            zebra: 1,
            apple: None,
            middle: "keep".to_string(),
        })
        .unwrap();
        let apple = text.find("apple");
        assert!(apple.is_none(), "null field trimmed");
        let m = text.find("middle").unwrap();
        let z = text.find("zebra").unwrap();
        assert!(m < z, "keys sorted");
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = SrsSettings::default();
        save_json(&path, &settings).unwrap();
        let back: SrsSettings = load_json(&path).unwrap();
        assert_eq!(settings, back);
    }

    #[test]
    fn load_or_init_persists_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("srs_settings.json");
        let loaded: SrsSettings = load_json_or_init(&path).unwrap();
        assert_eq!(loaded, SrsSettings::default());
        assert!(path.exists());
    }

    #[test]
    fn load_distinguishes_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("none.json");
        let err = load_json::<SrsSettings, _>(&missing).unwrap_err();
        assert_eq!(err.code(), "input_missing");

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        let err = load_json::<SrsSettings, _>(&bad).unwrap_err();
        assert_eq!(err.code(), "input_malformed");
    }

    #[test]
    fn profile_validation() {
        let base = Path::new("/data");
        let mut profile = Profile {
            profile_id: "default".to_string(),
            rulesets: vec![PathBuf::from("srs/srs_ruleset_en-ja.json")],
            ..Profile::default()
        };
        profile.validate_and_normalize(base).unwrap();
        assert!(profile.rulesets[0].is_absolute());
        assert_eq!(profile.active_ruleset, Some(profile.rulesets[0].clone()));

        let mut empty_id = Profile {
            rulesets: vec![PathBuf::from("x.json")],
            ..Profile::default()
        };
        assert!(empty_id.validate_and_normalize(base).is_err());

        let mut no_rulesets = Profile {
            profile_id: "p".to_string(),
            ..Profile::default()
        };
        assert!(no_rulesets.validate_and_normalize(base).is_err());
    }

    #[test]
    fn duplicate_profile_ids_rejected() {
        let mut settings = AppSettings::default();
        for _ in 0..2 {
            settings.profiles.push(Profile {
                profile_id: "p".to_string(),
                rulesets: vec![PathBuf::from("/r.json")],
                ..Profile::default()
            });
        }
        assert!(settings
            .validate_and_normalize(Path::new("/data"))
            .is_err());
    }

    #[test]
    fn profile_paths_layout() {
        let paths = ProfilePaths::new(Path::new("/root/data"), "default");
        assert_eq!(
            paths.store(),
            PathBuf::from("/root/data/profiles/default/srs/srs_store.json")
        );
        assert_eq!(
            paths.ruleset("en-ja"),
            PathBuf::from("/root/data/profiles/default/srs/srs_ruleset_en-ja.json")
        );
        assert_eq!(
            paths.snapshot("en-de"),
            PathBuf::from("/root/data/profiles/default/srs/srs_rulegen_snapshot_en-de.json")
        );
    }
}
