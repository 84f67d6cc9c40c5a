//! Hourly PM2.5 forecasting from weather conditions.
//!
//! The pipeline joins PM2.5 readings with weather into a training table,
//! fits a random forest on nine weather and calendar features, persists the
//! fitted model, and uses it to forecast the next 24 hours.
//!
//! ```rust,ignore
//! use pm25_forecast::prelude::*;
//!
//! let model = Trainer::default().train_from_csv(Path::new("data/training_data.csv"))?;
//! save_model(Path::new("models/pm25_model.bin"), &model)?;
//!
//! let mut forecaster = Forecaster::load(Path::new("models/pm25_model.bin"))?;
//! let points = forecaster.forecast_24h_now(&Weather::default(), None)?;
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod forecast;
pub mod model;
pub mod training;
pub mod utils;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::data::observation::{Observation, Weather};
    pub use crate::data::preprocessing::{
        encode, encode_features, load_table, FeatureSchema, FeatureTable, StandardScaler,
        FEATURE_COLUMNS,
    };
    pub use crate::data::source::{DataCollector, DataSource, FallbackReason, Sourced};
    pub use crate::data::synthetic::{Pm25Synthesizer, WeatherExtrapolator, WeatherSynthesizer};
    pub use crate::error::{Pm25Error, Result, SourceError};
    pub use crate::forecast::{AqiCategory, ForecastPoint, ForecastSummary, Forecaster};
    pub use crate::model::fitted::FittedModel;
    pub use crate::training::metrics::{FeatureImportance, Metrics, SplitMetrics};
    pub use crate::training::trainer::{Trainer, TrainerConfig};
    pub use crate::utils::io::{load_metrics, load_model, metrics_path, save_model};
}

pub use crate::error::{Pm25Error, Result};
