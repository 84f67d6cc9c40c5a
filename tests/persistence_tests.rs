//! Model artifact save/load tests.

mod common;

use std::fs;

use approx::assert_relative_eq;
use pm25_forecast::error::Pm25Error;
use pm25_forecast::forecast::Forecaster;
use pm25_forecast::utils::io::{load_metrics, load_model, metrics_path, save_model};

#[test]
fn test_round_trip_preserves_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("models").join("pm25_model.bin");

    let model = common::small_model();
    let obs = common::calm_afternoon();
    let before = model.predict(&obs).unwrap();

    save_model(&path, &model).expect("save should succeed");
    let loaded = load_model(&path).expect("load should succeed");

    assert_relative_eq!(loaded.predict(&obs).unwrap(), before, epsilon = 1e-12);
    assert_eq!(loaded.schema, model.schema);
    assert_eq!(loaded.scaler, model.scaler);
    assert_eq!(loaded.metrics, model.metrics);
    assert_eq!(loaded.trained_at, model.trained_at);
}

#[test]
fn test_loading_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pm25_model.bin");
    save_model(&path, &common::small_model()).unwrap();

    let a = load_model(&path).unwrap();
    let b = load_model(&path).unwrap();
    let batch = common::labeled_observations(24, 99);
    assert_eq!(a.predict_batch(&batch).unwrap(), b.predict_batch(&batch).unwrap());
}

#[test]
fn test_load_without_artifact_is_model_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pm25_model.bin");

    let err = load_model(&path).unwrap_err();
    assert!(matches!(err, Pm25Error::ModelNotFound { .. }));
    assert!(err.to_string().contains("train"));

    assert!(matches!(
        Forecaster::load(&path),
        Err(Pm25Error::ModelNotFound { .. })
    ));
}

#[test]
fn test_metrics_sidecar_written_and_optional() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pm25_model.bin");
    let model = common::small_model();
    save_model(&path, &model).unwrap();

    let sidecar = metrics_path(&path);
    assert_eq!(sidecar, dir.path().join("pm25_model_metrics.json"));
    assert_eq!(load_metrics(&path).unwrap(), model.metrics);

    let text = fs::read_to_string(&sidecar).unwrap();
    assert!(text.contains("\"rmse\""));
    assert!(text.contains("\"feature_importances\""));

    fs::remove_file(&sidecar).unwrap();
    assert!(load_model(&path).is_ok());
}

#[test]
fn test_save_replaces_previous_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pm25_model.bin");

    save_model(&path, &common::small_model()).unwrap();
    let second = common::small_trainer(2)
        .train_observations(&common::labeled_observations(80, 5))
        .unwrap();
    save_model(&path, &second).unwrap();

    assert_eq!(load_model(&path).unwrap().forest.n_trees(), 2);

    // only the artifact and its metrics summary remain, no temp files
    let entries = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 2);
}
