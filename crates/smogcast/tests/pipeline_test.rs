//! End-to-end tests against an in-memory store.

use approx::assert_abs_diff_eq;
use smogcast::data::{MemoryStore, ObjectStore, decode_batch};
use smogcast::model::{BoostingConfig, ExactGreedyConfig, HistogramConfig, StackingConfig};
use smogcast::{FittedPipeline, PipelineConfig, TrainConfig, predict_file, run_training_job};
use std::path::PathBuf;

const HEADER: &str = "Timestamp,City,Country,Latitude,Longitude,Temperature,Humidity,CO,PM2.5";
const CITIES: [&str; 4] = ["Delhi", "Oslo", "Lima", "Cairo"];

fn timestamp(i: usize) -> String {
    format!("2024-{:02}-{:02} {:02}:00:00", 1 + (i / 24) % 12, 1 + i % 28, i % 24)
}

fn row(i: usize, pm25_offset: f64) -> String {
    let city_idx = i % CITIES.len();
    let temperature = 5.0 + ((i * 7) % 30) as f64;
    let humidity = 30.0 + ((i * 13) % 60) as f64;
    let co = 200.0 + ((i * 29) % 400) as f64;
    let noise = ((i * 17) % 5) as f64;
    let pm25 = 10.0 + 20.0 * city_idx as f64 + co / 20.0 - temperature * 0.5 + noise + pm25_offset;
    format!(
        "{},{},Country,0.0,0.0,{},{},{},{}",
        timestamp(i),
        CITIES[city_idx],
        temperature,
        humidity,
        co,
        pm25
    )
}

fn batch(range: std::ops::Range<usize>, pm25_offset: f64) -> String {
    let mut csv = String::from(HEADER);
    for i in range {
        csv.push('\n');
        csv.push_str(&row(i, pm25_offset));
    }
    csv.push('\n');
    csv
}

fn quick_train() -> TrainConfig {
    let boosting = BoostingConfig {
        n_estimators: 40,
        learning_rate: 0.2,
        ..Default::default()
    };
    TrainConfig {
        model: StackingConfig {
            exact: ExactGreedyConfig {
                boosting: boosting.clone(),
                ..Default::default()
            },
            histogram: HistogramConfig {
                boosting,
                min_data_in_leaf: 5,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

fn workdir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("smogcast-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn config_in(dir: &std::path::Path) -> PipelineConfig {
    PipelineConfig {
        snapshot_path: dir.join("data/full_env_data.csv"),
        local_artifact_path: dir.join("models/stacked_env_model.json"),
        train: quick_train(),
        ..PipelineConfig::default()
    }
}

fn seeded_store(historical: String, live: String) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert("historical_global_env_data.csv", historical);
    store.insert("live_global_env_data.csv", live);
    store
}

#[test]
fn test_end_to_end_disjoint_batches() {
    let dir = workdir("disjoint");
    let config = config_in(&dir);
    let store = seeded_store(batch(0..100, 0.0), batch(100..110, 0.0));

    let run = run_training_job(&store, &config).unwrap();

    assert_eq!(run.report.merge.merged_rows, 110);
    assert_eq!(run.report.merge.duplicates_removed(), 0);
    assert_eq!(run.report.split.test_rows, 22);
    assert_eq!(run.report.split.train_rows, 88);
    // 4 city indicators + 8 numeric columns
    assert_eq!(run.report.split.n_features, 12);

    let metrics = run.outcome.metrics;
    assert!(metrics.r2 <= 1.0);
    assert!(metrics.mse >= 0.0);
    assert!(metrics.mae >= 0.0);
    assert!(metrics.r2 > 0.5, "r2 = {}", metrics.r2);

    assert!(run.publish.published());
    let stored = store.get("models/high_accuracy_env_model.json").unwrap();
    let local = std::fs::read(&config.local_artifact_path).unwrap();
    assert_eq!(stored, local);
    let restored = FittedPipeline::from_bytes(&stored).unwrap();
    assert_eq!(restored, run.outcome.pipeline);

    let snapshot = decode_batch(&std::fs::read(&config.snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot.len(), 110);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_overlapping_key_keeps_live_values() {
    let dir = workdir("overlap");
    let config = config_in(&dir);
    // live rows 99..109 overlap historical row 99; live readings are offset
    let store = seeded_store(batch(0..100, 0.0), batch(99..109, 1000.0));

    let run = run_training_job(&store, &config).unwrap();
    assert_eq!(run.report.merge.input_rows, 110);
    assert_eq!(run.report.merge.merged_rows, 109);
    assert_eq!(run.report.merge.duplicates_removed(), 1);

    let snapshot = decode_batch(&std::fs::read(&config.snapshot_path).unwrap()).unwrap();
    let key = timestamp(99);
    let survivors: Vec<_> = snapshot
        .iter()
        .filter(|o| o.timestamp == key && o.city == CITIES[99 % CITIES.len()])
        .collect();
    assert_eq!(survivors.len(), 1);
    assert!(survivors[0].pm25.unwrap() > 1000.0);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_only_live_batch_available() {
    let dir = workdir("live-only");
    let config = config_in(&dir);
    let store = MemoryStore::new();
    store.insert("live_global_env_data.csv", batch(0..60, 0.0));

    let run = run_training_job(&store, &config).unwrap();
    assert_eq!(run.report.merge.batches_merged, vec!["live_global_env_data.csv".to_string()]);
    assert_eq!(run.report.merge.batches_failed, vec!["historical_global_env_data.csv".to_string()]);
    assert_eq!(run.report.merge.merged_rows, 60);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_no_batches_is_fatal_and_stores_nothing() {
    let dir = workdir("fatal");
    let config = config_in(&dir);
    let store = MemoryStore::new();

    let err = run_training_job(&store, &config).unwrap_err();
    assert!(err.is_no_data());
    let message = err.to_string();
    assert!(message.contains("historical_global_env_data.csv"));
    assert!(message.contains("live_global_env_data.csv"));

    assert!(store.is_empty());
    assert!(!config.local_artifact_path.exists());
    assert!(!config.snapshot_path.exists());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_upload_failure_keeps_local_copy() {
    let dir = workdir("upload-failure");
    let config = config_in(&dir);
    let store = MemoryStore::read_only();
    store.insert("historical_global_env_data.csv", batch(0..80, 0.0));

    let run = run_training_job(&store, &config).unwrap();
    assert!(!run.publish.published());
    assert!(!run.report.artifact.published);
    assert!(run.report.artifact.publish_error.is_some());
    assert!(config.local_artifact_path.exists());
    assert!(!store.contains("models/high_accuracy_env_model.json"));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_identical_inputs_give_identical_models() {
    let dir_a = workdir("determinism-a");
    let dir_b = workdir("determinism-b");
    let store_a = seeded_store(batch(0..100, 0.0), batch(100..110, 0.0));
    let store_b = seeded_store(batch(0..100, 0.0), batch(100..110, 0.0));

    let run_a = run_training_job(&store_a, &config_in(&dir_a)).unwrap();
    let run_b = run_training_job(&store_b, &config_in(&dir_b)).unwrap();
    assert_abs_diff_eq!(run_a.outcome.metrics.r2, run_b.outcome.metrics.r2, epsilon = 1e-6);

    let probe = decode_batch(batch(500..501, 0.0).as_bytes()).unwrap();
    let a = run_a.outcome.pipeline.predict_observations(&probe).unwrap();
    let b = run_b.outcome.pipeline.predict_observations(&probe).unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(a[0].predicted_pm25, b[0].predicted_pm25);

    std::fs::remove_dir_all(&dir_a).unwrap();
    std::fs::remove_dir_all(&dir_b).unwrap();
}

#[test]
fn test_predict_file_skips_unusable_rows() {
    let dir = workdir("predict");
    let config = config_in(&dir);
    let store = seeded_store(batch(0..100, 0.0), batch(100..110, 0.0));
    run_training_job(&store, &config).unwrap();

    let pipeline = FittedPipeline::load(&config.local_artifact_path).unwrap();
    let input = dir.join("incoming.csv");
    std::fs::write(
        &input,
        format!(
            "{}\n\
             2025-02-01 08:00:00,Delhi,,,,20,50,300,\n\
             2025-02-01 09:00:00,Oslo,,,,4,80,,\n\
             not a time,Lima,,,,18,60,250,\n\
             2025-02-01 10:00:00,Atlantis,,,,25,40,500,33\n",
            HEADER
        ),
    )
    .unwrap();

    let records = predict_file(&pipeline, &input).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].city, "Delhi");
    assert_eq!(records[0].observed_pm25, None);
    assert_eq!(records[1].city, "Atlantis");
    assert_eq!(records[1].observed_pm25, Some(33.0));
    assert!(records.iter().all(|r| r.predicted_pm25.is_finite()));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_artifact_stored_under_configured_name() {
    let dir = workdir("artifact-name");
    let config = PipelineConfig {
        artifact_name: "models/custom.json".to_string(),
        ..config_in(&dir)
    };
    let store = seeded_store(batch(0..60, 0.0), batch(60..70, 0.0));
    run_training_job(&store, &config).unwrap();

    let pipeline = smogcast::fetch_pipeline(&store, "models/custom.json").unwrap();
    assert_eq!(pipeline.feature_names().len(), 12);
    assert!(store.fetch("models/high_accuracy_env_model.json").is_err());

    std::fs::remove_dir_all(&dir).unwrap();
}
