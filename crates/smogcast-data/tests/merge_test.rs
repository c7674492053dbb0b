//! Integration tests for fetching and merging observation batches.

use smogcast_data::{
    BatchSource, DataError, LocalStore, MemoryStore, Observation, ObjectStore, encode_batch,
    fetch_batches, merge_batches,
};

const HISTORICAL: &str = "historical_global_env_data.csv";
const LIVE: &str = "live_global_env_data.csv";

fn sources() -> Vec<(BatchSource, String)> {
    vec![
        (BatchSource::Historical, HISTORICAL.to_string()),
        (BatchSource::Live, LIVE.to_string()),
    ]
}

fn hourly_rows(city: &str, start_hour: usize, count: usize, pm25: f64) -> Vec<Observation> {
    (start_hour..start_hour + count)
        .map(|h| {
            let ts = format!("2025-03-{:02} {:02}:00:00", 1 + h / 24, h % 24);
            Observation::new(ts, city, Some(20.0), Some(55.0), Some(250.0), Some(pm25))
        })
        .collect()
}

#[test]
fn test_disjoint_batches_concatenate() {
    let store = MemoryStore::new();
    store.insert(HISTORICAL, encode_batch(&hourly_rows("Delhi", 0, 100, 80.0)).unwrap());
    store.insert(LIVE, encode_batch(&hourly_rows("Delhi", 100, 10, 90.0)).unwrap());

    let fetched = fetch_batches(&store, &sources());
    assert!(fetched.failures.is_empty());

    let merged = merge_batches(fetched.batches).unwrap();
    assert_eq!(merged.len(), 110);
    assert_eq!(merged.input_rows(), 110);
}

#[test]
fn test_overlapping_row_takes_live_values() {
    let historical = hourly_rows("Delhi", 0, 100, 80.0);
    let mut live = hourly_rows("Delhi", 100, 9, 90.0);
    let mut overlap = historical[42].clone();
    overlap.pm25 = Some(123.0);
    overlap.temperature = Some(33.0);
    live.push(overlap);

    let store = MemoryStore::new();
    store.insert(HISTORICAL, encode_batch(&historical).unwrap());
    store.insert(LIVE, encode_batch(&live).unwrap());

    let merged = merge_batches(fetch_batches(&store, &sources()).batches).unwrap();
    assert_eq!(merged.len(), 109);
    assert_eq!(merged.duplicates_removed(), 1);

    let survivor = merged
        .rows()
        .iter()
        .find(|o| o.timestamp == historical[42].timestamp)
        .unwrap();
    assert_eq!(survivor.pm25, Some(123.0));
    assert_eq!(survivor.temperature, Some(33.0));
}

#[test]
fn test_truncated_live_row_does_not_replace_historical() {
    let historical = hourly_rows("Delhi", 0, 3, 80.0);
    let live = format!(
        "{}\n{},Delhi\n",
        smogcast_data::BATCH_COLUMNS.join(","),
        historical[1].timestamp
    );

    let store = MemoryStore::new();
    store.insert(HISTORICAL, encode_batch(&historical).unwrap());
    store.insert(LIVE, live);

    let merged = merge_batches(fetch_batches(&store, &sources()).batches).unwrap();
    assert_eq!(merged.len(), 3);
    assert_eq!(merged.duplicates_removed(), 0);
    assert!(merged.rows().iter().all(|o| o.pm25 == Some(80.0)));
}

#[test]
fn test_only_live_batch_available() {
    let store = MemoryStore::new();
    store.insert(LIVE, encode_batch(&hourly_rows("Lima", 0, 10, 15.0)).unwrap());

    let fetched = fetch_batches(&store, &sources());
    assert_eq!(fetched.failures.len(), 1);
    assert!(matches!(
        &fetched.failures[0],
        smogcast_data::BatchFetchError::Fetch { error, .. } if error.is_not_found()
    ));
    assert_eq!(merge_batches(fetched.batches).unwrap().len(), 10);
}

#[test]
fn test_no_batches_is_fatal() {
    let store = MemoryStore::new();
    let fetched = fetch_batches(&store, &sources());
    assert_eq!(fetched.failures.len(), 2);
    assert!(matches!(merge_batches(fetched.batches), Err(DataError::NoData { .. })));
}

#[test]
fn test_snapshot_roundtrips_through_local_store() {
    let dir = std::env::temp_dir().join(format!("smogcast-merge-test-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let store = LocalStore::new(&dir);

    store
        .store(HISTORICAL, &encode_batch(&hourly_rows("Paris", 0, 5, 12.0)).unwrap())
        .unwrap();
    let merged = merge_batches(fetch_batches(&store, &sources()).batches).unwrap();

    store.store("data/full_env_data.csv", &merged.to_csv_bytes().unwrap()).unwrap();
    let reread =
        smogcast_data::decode_batch(&store.fetch("data/full_env_data.csv").unwrap()).unwrap();
    assert_eq!(reread, merged.rows());

    std::fs::remove_dir_all(dir).unwrap();
}
