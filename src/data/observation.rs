use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Pm25Error, Result};

/// One weather reading. Every field is required.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    /// °C
    pub temperature: f64,
    /// %, 0-100
    pub humidity: f64,
    /// hPa
    pub pressure: f64,
    /// m/s
    pub wind_speed: f64,
    /// degrees, 0-360
    pub wind_direction: f64,
    /// % cover, 0-100
    pub clouds: f64,
}

impl Default for Weather {
    /// Conditions assumed when a caller has no reading for a field.
    fn default() -> Self {
        Weather {
            temperature: 20.0,
            humidity: 60.0,
            pressure: 1013.0,
            wind_speed: 3.0,
            wind_direction: 180.0,
            clouds: 50.0,
        }
    }
}

impl Weather {
    /// Build a reading and check it against physical ranges.
    pub fn new(
        temperature: f64,
        humidity: f64,
        pressure: f64,
        wind_speed: f64,
        wind_direction: f64,
        clouds: f64,
    ) -> Result<Self> {
        let weather = Weather {
            temperature,
            humidity,
            pressure,
            wind_speed,
            wind_direction,
            clouds,
        };
        weather.validate()?;
        Ok(weather)
    }

    pub fn validate(&self) -> Result<()> {
        check_finite("temperature", self.temperature)?;
        check_finite("pressure", self.pressure)?;
        check_range("humidity", self.humidity, 0.0, 100.0)?;
        check_range("wind_speed", self.wind_speed, 0.0, f64::MAX)?;
        check_range("wind_direction", self.wind_direction, 0.0, 360.0)?;
        check_range("clouds", self.clouds, 0.0, 100.0)?;
        Ok(())
    }
}

/// A time-stamped weather reading with an optional PM2.5 label.
///
/// `hour`, `day_of_week` and `month` are always derived from `timestamp`,
/// so shifting the timestamp can never leave stale calendar fields behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub pm25: Option<f64>,
    pub weather: Weather,
}

impl Observation {
    /// Weather-only observation, as used at inference time.
    pub fn new(timestamp: DateTime<Utc>, weather: Weather) -> Result<Self> {
        weather.validate()?;
        Ok(Observation {
            timestamp,
            pm25: None,
            weather,
        })
    }

    /// Labeled observation for a training dataset.
    pub fn labeled(timestamp: DateTime<Utc>, pm25: f64, weather: Weather) -> Result<Self> {
        check_range("pm25", pm25, 0.0, f64::MAX)?;
        let mut observation = Observation::new(timestamp, weather)?;
        observation.pm25 = Some(pm25);
        Ok(observation)
    }

    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    /// Monday = 0 ... Sunday = 6.
    pub fn day_of_week(&self) -> u32 {
        self.timestamp.weekday().num_days_from_monday()
    }

    pub fn month(&self) -> u32 {
        self.timestamp.month()
    }

    /// Look up a model feature by its schema name.
    pub fn feature(&self, name: &str) -> Option<f64> {
        let w = &self.weather;
        match name {
            "temperature" => Some(w.temperature),
            "humidity" => Some(w.humidity),
            "pressure" => Some(w.pressure),
            "wind_speed" => Some(w.wind_speed),
            "wind_direction" => Some(w.wind_direction),
            "clouds" => Some(w.clouds),
            "hour" => Some(self.hour() as f64),
            "day_of_week" => Some(self.day_of_week() as f64),
            "month" => Some(self.month() as f64),
            _ => None,
        }
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Pm25Error::InvalidObservation { field, value })
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    check_finite(field, value)?;
    if value < min || value > max {
        return Err(Pm25Error::InvalidObservation { field, value });
    }
    Ok(())
}
