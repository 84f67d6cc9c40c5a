//! Training and evaluation tests.

mod common;

use std::fs;

use approx::assert_relative_eq;
use pm25_forecast::data::preprocessing::{FeatureTable, FEATURE_COLUMNS};
use pm25_forecast::data::source::{write_training_csv, DataCollector, NoLiveSource};
use pm25_forecast::error::Pm25Error;
use pm25_forecast::training::trainer::Trainer;

// ============================================================================
// Successful training
// ============================================================================

#[test]
fn test_train_500_complete_rows() {
    let rows = common::labeled_observations(500, 42);
    let model = Trainer::default()
        .train_observations(&rows)
        .expect("training should succeed");

    let m = &model.metrics;
    assert_eq!(m.train_rows, 400);
    assert_eq!(m.test_rows, 100);
    assert!(m.test.rmse >= 0.0);
    assert!(m.test.mae >= 0.0);
    assert!(m.train.r2 <= 1.0);
    assert!((m.importance_sum() - 1.0).abs() < 1e-6);
    assert_eq!(m.feature_importances.len(), 9);
    assert_eq!(model.forest.n_trees(), 100);
}

#[test]
fn test_model_learns_signal() {
    let model = common::small_trainer(20)
        .train_observations(&common::labeled_observations(400, 3))
        .expect("training should succeed");

    assert!(model.metrics.test.r2 > 0.5, "test R² = {}", model.metrics.test.r2);
    assert!(model.metrics.train.rmse <= model.metrics.test.rmse * 1.5);

    // wind speed drives the target far more than cloud cover
    let rank = |name: &str| {
        model
            .metrics
            .feature_importances
            .iter()
            .position(|f| f.feature == name)
            .unwrap()
    };
    assert!(rank("wind_speed") < rank("clouds"));
}

#[test]
fn test_importances_ranked_descending() {
    let model = common::small_model();
    let importances: Vec<f64> = model
        .metrics
        .feature_importances
        .iter()
        .map(|f| f.importance)
        .collect();
    assert!(importances.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_training_is_reproducible() {
    let rows = common::labeled_observations(150, 8);
    let a = common::small_trainer(5).train_observations(&rows).unwrap();
    let b = common::small_trainer(5).train_observations(&rows).unwrap();

    assert_eq!(a.forest, b.forest);
    assert_eq!(a.metrics, b.metrics);
}

#[test]
fn test_scaler_frozen_on_full_dataset() {
    let rows = common::labeled_observations(100, 4);
    let model = common::small_trainer(3).train_observations(&rows).unwrap();

    let temps: Vec<f64> = rows.iter().map(|r| r.weather.temperature).collect();
    let mean = temps.iter().sum::<f64>() / temps.len() as f64;
    assert_relative_eq!(model.scaler.mean[0], mean, epsilon = 1e-9);
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_missing_wind_direction_is_schema_error() {
    let headers: Vec<&str> = FEATURE_COLUMNS
        .iter()
        .copied()
        .filter(|c| *c != "wind_direction")
        .chain(std::iter::once("pm25"))
        .collect();
    let rows = vec![vec![Some(1.0); headers.len()]; 50];
    let table = FeatureTable::from_rows(&headers, &rows);

    match Trainer::default().train(&table) {
        Err(Pm25Error::Schema { missing }) => assert_eq!(missing, vec!["wind_direction".to_string()]),
        other => panic!("expected schema error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_all_rows_incomplete_is_insufficient_data() {
    let mut headers: Vec<&str> = FEATURE_COLUMNS.to_vec();
    headers.push("pm25");
    let mut row = vec![Some(1.0); headers.len()];
    row[0] = None;
    let table = FeatureTable::from_rows(&headers, &vec![row; 20]);

    assert!(matches!(
        Trainer::default().train(&table),
        Err(Pm25Error::InsufficientData { rows: 0, .. })
    ));
}

#[test]
fn test_missing_csv_is_data_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = Trainer::default()
        .train_from_csv(&dir.path().join("training_data.csv"))
        .unwrap_err();
    assert!(matches!(err, Pm25Error::DataNotFound { .. }));
    assert!(err.to_string().contains("collect"));
}

// ============================================================================
// CSV input
// ============================================================================

#[test]
fn test_collect_then_train_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("training_data.csv");

    let mut collector: DataCollector<NoLiveSource> = DataCollector::seeded(None, 21);
    let rows = collector
        .build_training_dataset(5, common::start())
        .unwrap();
    write_training_csv(&path, &rows).unwrap();

    let model = common::small_trainer(5).train_from_csv(&path).unwrap();
    assert_eq!(model.metrics.train_rows + model.metrics.test_rows, 5 * 24 + 1);
}

#[test]
fn test_csv_column_order_and_blanks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shuffled.csv");

    let mut csv = String::from(
        "clouds,pm25,timestamp,wind_direction,temperature,humidity,pressure,wind_speed,station\n",
    );
    for i in 0..40 {
        let pm25 = if i == 5 { String::new() } else { format!("{}", 20 + i) };
        csv.push_str(&format!(
            "{},{},2024-02-01 {:02}:00:00,{},{},{},1013,{},Simulated Station\n",
            i % 100,
            pm25,
            i % 24,
            (i * 9) % 360,
            10.0 + i as f64 * 0.1,
            50 + i % 40,
            1.0 + (i % 5) as f64
        ));
    }
    fs::write(&path, csv).unwrap();

    // hour/day_of_week/month are derived from the timestamp column
    let model = common::small_trainer(3).train_from_csv(&path).unwrap();
    assert_eq!(model.metrics.train_rows + model.metrics.test_rows, 39);
}

#[test]
fn test_csv_with_foreign_timestamps_uses_stored_calendar() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foreign_timestamps.csv");

    let mut csv = String::from(
        "timestamp,pm25,temperature,humidity,pressure,wind_speed,wind_direction,clouds,hour,day_of_week,month\n",
    );
    for i in 0..30 {
        csv.push_str(&format!(
            "01/02/2024 {:02}:00,{},{},{},1013,{},{},{},{},3,2\n",
            i % 24,
            20 + i,
            10.0 + i as f64 * 0.2,
            55 + i % 30,
            1.0 + (i % 4) as f64,
            (i * 12) % 360,
            i % 100,
            i % 24
        ));
    }
    fs::write(&path, csv).unwrap();

    let model = common::small_trainer(3).train_from_csv(&path).unwrap();
    assert_eq!(model.metrics.train_rows + model.metrics.test_rows, 30);
}

#[test]
fn test_csv_missing_column_is_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no_wind_direction.csv");
    fs::write(
        &path,
        "timestamp,pm25,temperature,humidity,pressure,wind_speed,clouds\n\
         2024-02-01T00:00:00Z,25,10,60,1013,3,40\n\
         2024-02-01T01:00:00Z,27,11,61,1013,3,40\n",
    )
    .unwrap();

    match Trainer::default().train_from_csv(&path) {
        Err(Pm25Error::Schema { missing }) => assert_eq!(missing, vec!["wind_direction".to_string()]),
        other => panic!("expected schema error, got {:?}", other.map(|_| ())),
    }
}
