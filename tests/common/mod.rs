//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::f64::consts::PI;

use chrono::{DateTime, Duration, TimeZone, Utc};
use pm25_forecast::data::observation::{Observation, Weather};
use pm25_forecast::data::synthetic::WeatherSynthesizer;
use pm25_forecast::model::fitted::FittedModel;
use pm25_forecast::model::forest::ForestParams;
use pm25_forecast::training::trainer::{Trainer, TrainerConfig};

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// PM2.5 driven by wind, humidity and time of day, so the forest has something to learn.
pub fn pm25_for(weather: &Weather, hour: u32) -> f64 {
    let traffic = 12.0 * (2.0 * PI * hour as f64 / 24.0).cos();
    (70.0 - 6.0 * weather.wind_speed + 0.2 * weather.humidity + traffic).clamp(5.0, 150.0)
}

/// `n` hourly labeled observations with seeded synthetic weather.
pub fn labeled_observations(n: usize, seed: u64) -> Vec<Observation> {
    let mut synth = WeatherSynthesizer::seeded(seed);
    (0..n)
        .map(|i| {
            let ts = start() + Duration::hours(i as i64);
            let weather = synth.generate(ts);
            let obs = Observation::new(ts, weather).unwrap();
            let pm25 = pm25_for(&weather, obs.hour());
            Observation::labeled(ts, pm25, weather).unwrap()
        })
        .collect()
}

pub fn small_trainer(n_trees: usize) -> Trainer {
    Trainer::new(TrainerConfig {
        forest: ForestParams {
            n_trees,
            ..ForestParams::default()
        },
        ..TrainerConfig::default()
    })
}

pub fn small_model() -> FittedModel {
    small_trainer(10)
        .train_observations(&labeled_observations(200, 11))
        .unwrap()
}

pub fn calm_afternoon() -> Observation {
    let ts = Utc.with_ymd_and_hms(2024, 1, 17, 14, 0, 0).unwrap();
    Observation::new(ts, Weather::new(22.5, 65.0, 1013.0, 3.5, 180.0, 40.0).unwrap()).unwrap()
}
