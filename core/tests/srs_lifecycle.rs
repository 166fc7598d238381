//! Learning-set lifecycle: seed selection, admission, feedback scheduling
//! and the refresh decision, end to end.

use ahash::AHashSet;
use lexishift_core::srs::admission::{apply_admission, decide_admission, AdmissionRefreshPolicy};
use lexishift_core::srs::scheduler::{select_active_items, SECONDS_PER_DAY};
use lexishift_core::srs::signals::SignalEvent;
use lexishift_core::srs::store::{Rating, SrsStore};
use lexishift_core::srs::SrsSettings;
use lexishift_core::{build_seed_candidates, FrequencyStore, SelectorConfig};
use rusqlite::Connection;
use tempfile::TempDir;

fn fixture_store(dir: &TempDir) -> FrequencyStore {
    let path = dir.path().join("freq.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE freq (lemma TEXT, core_rank INTEGER, pmw REAL, pos TEXT);
         INSERT INTO freq VALUES ('猫', 1, 900.0, 'n');
         INSERT INTO freq VALUES ('犬', 2, 850.0, 'n');
         INSERT INTO freq VALUES ('走る', 3, 800.0, 'v');
         INSERT INTO freq VALUES ('静か', 4, 750.0, 'adj');
         INSERT INTO freq VALUES ('鳥', 5, 700.0, 'n');",
    )
    .unwrap();
    drop(conn);
    FrequencyStore::open(&path, None).unwrap()
}

#[test]
fn bootstrap_feedback_and_refresh_cycle() {
    let dir = TempDir::new().unwrap();
    let freq = fixture_store(&dir);
    let config = SelectorConfig::new("en-ja", "ja", 100);
    let seeds = build_seed_candidates(&freq, &config, &AHashSet::new(), None).unwrap();
    assert_eq!(seeds.len(), 5);

    // bootstrap: admit the top three
    let day = SECONDS_PER_DAY;
    let now = 100 * day;
    let (store, admitted) = apply_admission(&SrsStore::default(), "en-ja", &seeds, 3, now);
    assert_eq!(admitted.len(), 3);
    assert!(admitted.contains(&"猫".to_string()));

    // new items are immediately servable
    let settings = SrsSettings::default();
    let allowed = ["en-ja".to_string()];
    let due = select_active_items(&store.items, now, settings.max_active_items as usize, &allowed);
    assert_eq!(due.len(), 3);

    // a week of solid feedback pushes items out into the future
    let mut store = store;
    let mut events = Vec::new();
    let mut t = now;
    for _ in 0..8 {
        for lemma in &admitted {
            store = store.record_feedback("en-ja", lemma, Rating::Good, t, true);
            events.push(SignalEvent::feedback("en-ja", lemma.clone(), Rating::Good, t));
        }
        t += day;
    }
    let item = store.find("en-ja", "猫").unwrap();
    assert!(item.stability.unwrap() > 1.0);
    assert!(item.next_due.unwrap() > t);
    assert_eq!(item.history.len(), 8);

    // healthy retention over a full window admits the full budget
    let decision = decide_admission(
        &store,
        &settings,
        "en-ja",
        t,
        &events,
        &AdmissionRefreshPolicy::default(),
    );
    assert_eq!(decision.reason_code, "normal");
    assert_eq!(decision.retention, Some(1.0));
    assert!(decision.admission_budget > 0);

    let (refreshed, newly) =
        apply_admission(&store, "en-ja", &seeds, decision.admission_budget, t);
    // the two remaining candidates come in, already-known lemmas skipped
    assert_eq!(newly.len(), 2);
    assert_eq!(refreshed.items_for_pair("en-ja").count(), 5);
}

#[test]
fn failing_items_come_back_quickly_and_block_growth() {
    let dir = TempDir::new().unwrap();
    let freq = fixture_store(&dir);
    let config = SelectorConfig::new("en-ja", "ja", 100);
    let seeds = build_seed_candidates(&freq, &config, &AHashSet::new(), None).unwrap();

    let day = SECONDS_PER_DAY;
    let now = 50 * day;
    let (mut store, admitted) = apply_admission(&SrsStore::default(), "en-ja", &seeds, 2, now);

    let mut events = Vec::new();
    for i in 0..10 {
        let t = now + i;
        for lemma in &admitted {
            store = store.record_feedback("en-ja", lemma, Rating::Again, t, false);
            events.push(SignalEvent::feedback("en-ja", lemma.clone(), Rating::Again, t));
        }
    }
    let item = store.find("en-ja", "猫").unwrap();
    // repeated failures shrink the interval to less than a day
    assert!(item.next_due.unwrap() - item.last_seen.unwrap() < day);

    let decision = decide_admission(
        &store,
        &SrsSettings::default(),
        "en-ja",
        now + 11,
        &events,
        &AdmissionRefreshPolicy::default(),
    );
    assert_eq!(decision.reason_code, "retention_low");
    assert_eq!(decision.admission_budget, 0);
}
