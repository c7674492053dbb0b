//! Integration tests for evaluation, reporting and export.

use approx::assert_abs_diff_eq;
use smogcast_output::{
    ArtifactSummary, DropSummary, ExportFormat, Exporter, MergeSummary, PredictionRecord,
    RegressionMetrics, ReportBuilder, SplitSummary,
};

#[test]
fn test_evaluate_then_report() {
    let truth = [12.0, 30.0, 55.0, 80.0];
    let predicted = [14.0, 28.0, 50.0, 84.0];

    let metrics = RegressionMetrics::compute(&truth, &predicted).unwrap();
    // residuals 2, -2, -5, 4
    assert_abs_diff_eq!(metrics.mse, (4.0 + 4.0 + 25.0 + 16.0) / 4.0, epsilon = 1e-12);
    assert_abs_diff_eq!(metrics.mae, 13.0 / 4.0, epsilon = 1e-12);
    assert!(metrics.r2 > 0.9 && metrics.r2 < 1.0);

    let report = ReportBuilder::new()
        .merge(MergeSummary {
            batches_merged: vec!["historical_global_env_data.csv".into()],
            batches_failed: vec!["live_global_env_data.csv".into()],
            input_rows: 4,
            merged_rows: 4,
        })
        .drops(DropSummary::default())
        .split(SplitSummary {
            train_rows: 16,
            test_rows: 4,
            n_features: 10,
        })
        .metrics(metrics)
        .artifact(ArtifactSummary {
            local_path: "models/stacked_env_model.json".into(),
            remote_name: "models/high_accuracy_env_model.json".into(),
            size_bytes: 2048,
            published: true,
            publish_error: None,
        })
        .build()
        .unwrap();

    let table = report.to_ascii_table();
    assert!(table.contains("Batches unavailable"));
    assert!(table.contains("live_global_env_data.csv"));
    assert!(table.contains(&format!("{:.2}%", metrics.accuracy_pct())));

    let json = report.to_json().unwrap();
    assert!(json.contains("\"merged_rows\": 4"));
}

#[test]
fn test_export_predictions_to_file() {
    let dir = std::env::temp_dir().join(format!("smogcast-output-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("predictions.csv");

    let records = vec![
        PredictionRecord::new("2024-01-05 08:00:00".into(), "Lima".into(), 21.5, Some(20.0)),
        PredictionRecord::new("2024-01-05 09:00:00".into(), "Lima".into(), 23.0, Some(24.0)),
    ];
    records.export_to_file(&path, ExportFormat::Csv).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written.lines().count(), 3);
    assert!(written.starts_with("Timestamp,City,Predicted_PM2.5,PM2.5"));

    std::fs::remove_dir_all(&dir).unwrap();
}
