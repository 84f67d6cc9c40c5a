use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::{Pm25Error, Result};
use crate::model::fitted::FittedModel;
use crate::training::metrics::Metrics;

/// Sibling of the model artifact holding its metrics as JSON:
/// `models/pm25_model.bin` -> `models/pm25_model_metrics.json`.
pub fn metrics_path(model_path: &Path) -> PathBuf {
    let stem = model_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    model_path.with_file_name(format!("{}_metrics.json", stem))
}

/// Persist `model` at `path`, replacing any previous artifact.
///
/// The artifact is written to a temporary file in the same directory and
/// renamed into place, so readers see either the old model or the new one.
pub fn save_model(path: &Path, model: &FittedModel) -> Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        bincode::serialize_into(&mut writer, model)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Pm25Error::Io(e.error))?;
    info!(path = %path.display(), "model saved");

    let summary = metrics_path(path);
    match write_metrics(&summary, &model.metrics) {
        Ok(()) => info!(path = %summary.display(), "metrics saved"),
        Err(e) => warn!(path = %summary.display(), error = %e, "could not write metrics summary"),
    }
    Ok(())
}

pub fn load_model(path: &Path) -> Result<FittedModel> {
    if !path.exists() {
        return Err(Pm25Error::ModelNotFound {
            path: path.to_path_buf(),
        });
    }
    let reader = BufReader::new(fs::File::open(path)?);
    let model: FittedModel = bincode::deserialize_from(reader)?;
    info!(path = %path.display(), trained_at = %model.trained_at, "model loaded");
    Ok(model)
}

/// Read only the metrics summary written next to the artifact at `model_path`.
pub fn load_metrics(model_path: &Path) -> Result<Metrics> {
    let path = metrics_path(model_path);
    let data = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&data)?)
}

fn write_metrics(path: &Path, metrics: &Metrics) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
    serde_json::to_writer_pretty(&mut tmp, metrics)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path).map_err(|e| Pm25Error::Io(e.error))?;
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
