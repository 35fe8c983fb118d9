//! Integration tests for the on-disk state store and config overlay

use gleaner::config::{apply_env_overrides, load_config, Config, ENV_DEFAULT_RPS, ENV_STATE_DB};
use gleaner::output::load_job_statistics;
use gleaner::storage::{SqliteStateStore, StateStore};
use gleaner::Record;
use serde_json::json;
use std::io::Write;

fn record(value: serde_json::Value) -> Record {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.sqlite");

    {
        let mut store = SqliteStateStore::new(&path).unwrap();
        let inserted = store
            .upsert_items(
                "jobs",
                &[
                    record(json!({"id": "1", "title": "Engineer"})),
                    record(json!({"id": "2", "title": "Designer"})),
                    record(json!({"title": "no id"})),
                ],
            )
            .unwrap();
        assert_eq!(inserted, 2);
        store.record_failed_url("jobs", "https://x.test/3", "HTTP 500").unwrap();
        store.save_cursor("jobs", Some("https://x.test/3")).unwrap();
    }

    let mut store = SqliteStateStore::new(&path).unwrap();
    assert_eq!(store.count_items("jobs").unwrap(), 2);
    assert_eq!(store.load_cursor("jobs").unwrap().as_deref(), Some("https://x.test/3"));

    store.record_failed_url("jobs", "https://x.test/3", "timeout").unwrap();
    let failed = store.failed_urls("jobs").unwrap();
    assert_eq!(failed[0].retry_count, 2);
    assert_eq!(failed[0].error_message, "timeout");

    let item = store.get_item("jobs", "2").unwrap().unwrap();
    assert_eq!(item.payload, json!({"id": "2", "title": "Designer"}));

    let stats = load_job_statistics(&store, "jobs").unwrap();
    assert_eq!(stats.total_items, 2);
    assert_eq!(stats.failed_urls.len(), 1);
}

#[test]
fn test_jobs_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SqliteStateStore::new(&dir.path().join("state.sqlite")).unwrap();

    store.upsert_items("a", &[record(json!({"id": 1}))]).unwrap();
    store.record_failed_url("a", "https://x.test/", "boom").unwrap();
    store.save_cursor("a", Some("https://x.test/2")).unwrap();

    assert_eq!(store.count_items("b").unwrap(), 0);
    assert!(store.failed_urls("b").unwrap().is_empty());
    assert_eq!(store.load_cursor("b").unwrap(), None);
}

#[test]
fn test_config_file_with_env_overlay() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[politeness]\nrequests-per-second = 2.0\nburst = 3\n\n[http]\nmax-attempts = 5"
    )
    .unwrap();
    file.flush().unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.politeness.burst, 3);
    assert_eq!(config.http.max_attempts, 5);

    let mut config = Config::default();
    apply_env_overrides(&mut config, |key| match key {
        k if k == ENV_DEFAULT_RPS => Some("0.5".to_string()),
        k if k == ENV_STATE_DB => Some("/tmp/other.sqlite".to_string()),
        _ => None,
    });
    assert_eq!(config.politeness.requests_per_second, 0.5);
    assert_eq!(config.storage.state_path, "/tmp/other.sqlite");
}
