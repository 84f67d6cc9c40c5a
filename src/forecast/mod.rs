//! 24-hour PM2.5 forecasting on top of a fitted model.

pub mod aqi;

use std::path::Path;

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::observation::{Observation, Weather};
use crate::data::synthetic::WeatherExtrapolator;
use crate::error::Result;
use crate::model::fitted::FittedModel;
use crate::utils::io::load_model;

pub use aqi::AqiCategory;

pub const FORECAST_HOURS: u32 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub pm25_predicted: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
}

impl ForecastPoint {
    pub fn category(&self) -> AqiCategory {
        AqiCategory::from_pm25(self.pm25_predicted)
    }
}

/// Headline numbers for a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

impl ForecastSummary {
    pub fn of(points: &[ForecastPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let values = points.iter().map(|p| p.pm25_predicted);
        Some(ForecastSummary {
            mean: values.clone().sum::<f64>() / points.len() as f64,
            max: values.clone().fold(f64::NEG_INFINITY, f64::max),
            min: values.fold(f64::INFINITY, f64::min),
        })
    }
}

pub struct Forecaster {
    model: FittedModel,
    extrapolator: WeatherExtrapolator,
}

impl Forecaster {
    pub fn new(model: FittedModel) -> Self {
        Forecaster {
            model,
            extrapolator: WeatherExtrapolator::new(),
        }
    }

    /// Reproducible weather extrapolation, for tests.
    pub fn with_seed(model: FittedModel, seed: u64) -> Self {
        Forecaster {
            model,
            extrapolator: WeatherExtrapolator::seeded(seed),
        }
    }

    /// Load the artifact at `path`, failing with `ModelNotFound` if there is none.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(load_model(path)?))
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    /// Clamped PM2.5 estimate for one observation.
    pub fn predict(&self, observation: &Observation) -> Result<f64> {
        self.model.predict(observation)
    }

    /// Hourly forecast for the 24 hours starting at the hour containing `now`.
    ///
    /// Step `h` uses `feed[h]` when the feed has that entry and otherwise
    /// extrapolates `current` forward by `h` hours.
    pub fn forecast_24h(
        &mut self,
        current: &Weather,
        feed: Option<&[Weather]>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ForecastPoint>> {
        let start = now.duration_trunc(Duration::hours(1)).unwrap_or(now);

        let mut observations = Vec::with_capacity(FORECAST_HOURS as usize);
        for h in 0..FORECAST_HOURS {
            let weather = match feed.and_then(|f| f.get(h as usize)) {
                Some(w) => *w,
                None => self.extrapolator.extrapolate(current, h),
            };
            observations.push(Observation::new(start + Duration::hours(h as i64), weather)?);
        }

        let predictions = self.model.predict_batch(&observations)?;
        debug!(start = %start, "24h forecast computed");

        Ok(observations
            .iter()
            .zip(predictions)
            .map(|(obs, pm25)| ForecastPoint {
                timestamp: obs.timestamp,
                pm25_predicted: pm25,
                temperature: obs.weather.temperature,
                humidity: obs.weather.humidity,
                wind_speed: obs.weather.wind_speed,
            })
            .collect())
    }

    pub fn forecast_24h_now(&mut self, current: &Weather, feed: Option<&[Weather]>) -> Result<Vec<ForecastPoint>> {
        self.forecast_24h(current, feed, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(pm25: f64) -> ForecastPoint {
        ForecastPoint {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            pm25_predicted: pm25,
            temperature: 20.0,
            humidity: 60.0,
            wind_speed: 3.0,
        }
    }

    #[test]
    fn summary_of_points() {
        let summary = ForecastSummary::of(&[point(10.0), point(30.0), point(20.0)]).unwrap();
        assert_eq!(summary.mean, 20.0);
        assert_eq!(summary.max, 30.0);
        assert_eq!(summary.min, 10.0);
        assert!(ForecastSummary::of(&[]).is_none());
    }

    #[test]
    fn point_category() {
        assert_eq!(point(40.0).category(), AqiCategory::UnhealthyForSensitiveGroups);
    }
}
