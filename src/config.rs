use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Paths and location settings shared by the CLI commands.
///
/// `city` and `country` label the collected data and the printed forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model_path: PathBuf,
    pub data_path: PathBuf,
    pub training_days: u32,
    pub city: String,
    pub country: String,
    /// Seeds the synthetic generators; unset means fresh randomness on every run.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            model_path: PathBuf::from("models/pm25_model.bin"),
            data_path: PathBuf::from("data/training_data.csv"),
            training_days: 30,
            city: "Bucharest".to_string(),
            country: "RO".to_string(),
            seed: None,
        }
    }
}

impl Config {
    /// Read a JSON config file. Fields it omits keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Config::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply `MODEL_PATH`, `DATA_PATH`, `TRAINING_DAYS`, `DEFAULT_CITY`,
    /// `DEFAULT_COUNTRY` and `PM25_SEED`.
    /// Values that fail to parse are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MODEL_PATH") {
            self.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("DATA_PATH") {
            self.data_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TRAINING_DAYS").and_then(|s| s.parse().ok()) {
            self.training_days = v;
        }
        if let Some(v) = lookup("DEFAULT_CITY") {
            self.city = v;
        }
        if let Some(v) = lookup("DEFAULT_COUNTRY") {
            self.country = v;
        }
        if let Some(v) = lookup("PM25_SEED").and_then(|s| s.parse().ok()) {
            self.seed = Some(v);
        }
        self
    }
}
