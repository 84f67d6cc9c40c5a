//! Procedural stand-ins for the live weather and air-quality feeds.
//!
//! Each generator owns its RNG. `seeded` gives reproducible draws for tests
//! and fixtures; `new` draws from OS entropy, which is what the fallback path
//! uses in production.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use ndarray::Array1;
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_rand::rand_distr::{Exp1, StandardNormal};
use ndarray_rand::RandomExt;
use rand_chacha::ChaCha8Rng;

use crate::data::observation::Weather;

const HUMIDITY_MIN: f64 = 30.0;
const HUMIDITY_MAX: f64 = 95.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn hour_of_day(ts: &DateTime<Utc>) -> f64 {
    ts.hour() as f64 + ts.minute() as f64 / 60.0
}

/// Seasonal + diurnal weather model with bounded noise.
pub struct WeatherSynthesizer {
    rng: ChaCha8Rng,
}

impl Default for WeatherSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherSynthesizer {
    pub fn new() -> Self {
        WeatherSynthesizer {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        WeatherSynthesizer {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn generate(&mut self, timestamp: DateTime<Utc>) -> Weather {
        let hour = timestamp.hour() as f64;
        let day_of_year = timestamp.ordinal() as f64;

        let seasonal = 15.0 + 10.0 * (2.0 * PI * day_of_year / 365.0).sin();
        let diurnal = 5.0 * (2.0 * PI * hour / 24.0).sin();
        let temp_noise = (2.0 * self.standard_normal()).clamp(-6.0, 6.0);
        let temperature = seasonal + diurnal + temp_noise;

        // Warmer air holds the same moisture at lower relative humidity.
        let humidity = (70.0 - (temperature - 15.0) * 2.0 + 10.0 * self.standard_normal())
            .clamp(HUMIDITY_MIN, HUMIDITY_MAX);

        let pressure = 1013.0 + 5.0 * self.standard_normal();
        let wind_speed = 2.0 + 3.0 * self.rng.sample::<f64, _>(Exp1);
        let wind_direction = self.rng.gen_range(0.0..360.0);
        let clouds = self.rng.gen_range(0.0..=100.0);

        Weather {
            temperature: round2(temperature),
            humidity: round2(humidity),
            pressure: round2(pressure),
            wind_speed: round2(wind_speed),
            wind_direction: round2(wind_direction),
            clouds: round2(clouds),
        }
    }

    fn standard_normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }
}

/// Hourly PM2.5 history: base level + diurnal sinusoid + Gaussian noise.
pub struct Pm25Synthesizer {
    rng: ChaCha8Rng,
    pub base: f64,
    pub amplitude: f64,
    pub noise_std: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for Pm25Synthesizer {
    fn default() -> Self {
        Self::with_rng(ChaCha8Rng::from_entropy())
    }
}

impl Pm25Synthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(rng: ChaCha8Rng) -> Self {
        Pm25Synthesizer {
            rng,
            base: 30.0,
            amplitude: 20.0,
            noise_std: 10.0,
            min: 5.0,
            max: 150.0,
        }
    }

    /// One reading per hour from `end - days` through `end`, oldest first.
    pub fn generate(&mut self, days: u32, end: DateTime<Utc>) -> Vec<(DateTime<Utc>, f64)> {
        let start = end - Duration::days(days as i64);
        let n = days as usize * 24 + 1;

        let noise = Array1::<f64>::random_using(n, StandardNormal, &mut self.rng) * self.noise_std;

        (0..n)
            .map(|i| {
                let ts = start + Duration::hours(i as i64);
                let diurnal = self.amplitude * (2.0 * PI * hour_of_day(&ts) / 24.0).sin();
                let value = (self.base + diurnal + noise[i]).clamp(self.min, self.max);
                (ts, value)
            })
            .collect()
    }
}

/// Projects a current reading forward by a number of hours for the forecast loop.
///
/// Temperature and humidity follow a 24 h sinusoid around the current values,
/// wind and pressure jitter slightly, direction and cloud cover are held.
pub struct WeatherExtrapolator {
    rng: ChaCha8Rng,
}

impl Default for WeatherExtrapolator {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherExtrapolator {
    pub fn new() -> Self {
        WeatherExtrapolator {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        WeatherExtrapolator {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn extrapolate(&mut self, current: &Weather, hours_ahead: u32) -> Weather {
        let phase = (2.0 * PI * hours_ahead as f64 / 24.0).sin();
        let wind_jitter: f64 = self.rng.sample(StandardNormal);
        let pressure_jitter: f64 = self.rng.sample(StandardNormal);

        Weather {
            temperature: current.temperature + 3.0 * phase,
            humidity: (current.humidity - 5.0 * phase).clamp(HUMIDITY_MIN, HUMIDITY_MAX),
            pressure: current.pressure + pressure_jitter,
            wind_speed: (current.wind_speed + 0.5 * wind_jitter).max(0.0),
            wind_direction: current.wind_direction,
            clouds: current.clouds,
        }
    }
}
