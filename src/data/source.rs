use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use csv::Writer;
use tracing::{info, warn};

use crate::data::observation::{Observation, Weather};
use crate::data::preprocessing::{FEATURE_COLUMNS, LABEL_COLUMN, TIMESTAMP_COLUMN};
use crate::data::synthetic::{Pm25Synthesizer, WeatherSynthesizer};
use crate::error::{Result, SourceError};

/// A live provider of air-quality history and weather readings.
pub trait DataSource {
    /// Hourly (timestamp, PM2.5) pairs for the last `days` days, oldest first.
    fn historical_pm25(
        &mut self,
        days: u32,
    ) -> std::result::Result<Vec<(DateTime<Utc>, f64)>, SourceError>;

    /// A complete weather reading for `timestamp`.
    fn weather_at(&mut self, timestamp: DateTime<Utc>) -> std::result::Result<Weather, SourceError>;
}

/// Why generated data was used in place of the live feed.
#[derive(Debug)]
pub enum FallbackReason {
    NotConfigured,
    Empty,
    Failed(SourceError),
}

/// Data tagged with where it came from.
#[derive(Debug)]
pub enum Sourced<T> {
    Live(T),
    Synthetic { data: T, reason: FallbackReason },
}

impl<T> Sourced<T> {
    pub fn is_live(&self) -> bool {
        matches!(self, Sourced::Live(_))
    }

    pub fn data(&self) -> &T {
        match self {
            Sourced::Live(data) | Sourced::Synthetic { data, .. } => data,
        }
    }

    pub fn into_data(self) -> T {
        match self {
            Sourced::Live(data) | Sourced::Synthetic { data, .. } => data,
        }
    }
}

/// Fetches from an optional live source, substituting generated data when it
/// is absent, empty, or failing.
pub struct DataCollector<S> {
    live: Option<S>,
    weather: WeatherSynthesizer,
    pm25: Pm25Synthesizer,
}

impl<S: DataSource> DataCollector<S> {
    pub fn new(live: Option<S>) -> Self {
        DataCollector {
            live,
            weather: WeatherSynthesizer::new(),
            pm25: Pm25Synthesizer::new(),
        }
    }

    /// Reproducible synthetic draws, for fixtures and demos.
    pub fn seeded(live: Option<S>, seed: u64) -> Self {
        DataCollector {
            live,
            weather: WeatherSynthesizer::seeded(seed),
            pm25: Pm25Synthesizer::seeded(seed.wrapping_add(1)),
        }
    }

    pub fn historical_pm25(&mut self, days: u32, end: DateTime<Utc>) -> Sourced<Vec<(DateTime<Utc>, f64)>> {
        let reason = match self.live.as_mut().map(|src| src.historical_pm25(days)) {
            None => FallbackReason::NotConfigured,
            Some(Ok(series)) if series.is_empty() => FallbackReason::Empty,
            Some(Ok(series)) => {
                let total = series.len();
                let valid: Vec<_> = series
                    .into_iter()
                    .filter(|(_, pm25)| pm25.is_finite() && *pm25 >= 0.0)
                    .collect();
                if valid.len() < total {
                    warn!(dropped = total - valid.len(), total, "dropped invalid live PM2.5 readings");
                }
                if valid.is_empty() {
                    FallbackReason::Failed(SourceError::Malformed(format!(
                        "all {} PM2.5 readings were negative or non-finite",
                        total
                    )))
                } else {
                    info!(rows = valid.len(), "collected PM2.5 history from live source");
                    return Sourced::Live(valid);
                }
            }
            Some(Err(e)) => FallbackReason::Failed(e),
        };

        warn!(?reason, days, "using synthetic PM2.5 history");
        Sourced::Synthetic {
            data: self.pm25.generate(days, end),
            reason,
        }
    }

    pub fn weather_at(&mut self, timestamp: DateTime<Utc>) -> Sourced<Weather> {
        let reason = match self.live.as_mut().map(|src| src.weather_at(timestamp)) {
            None => FallbackReason::NotConfigured,
            Some(Ok(weather)) => match weather.validate() {
                Ok(()) => return Sourced::Live(weather),
                Err(e) => FallbackReason::Failed(SourceError::Malformed(e.to_string())),
            },
            Some(Err(e)) => FallbackReason::Failed(e),
        };

        // Absence of a configured source is routine; only degradations are worth a warning.
        if !matches!(reason, FallbackReason::NotConfigured) {
            warn!(?reason, %timestamp, "using synthetic weather");
        }
        Sourced::Synthetic {
            data: self.weather.generate(timestamp),
            reason,
        }
    }

    /// Join PM2.5 history with weather at each timestamp.
    pub fn build_training_dataset(&mut self, days: u32, end: DateTime<Utc>) -> Result<Vec<Observation>> {
        let history = self.historical_pm25(days, end).into_data();
        info!(rows = history.len(), "collecting weather for PM2.5 readings");

        let total = history.len();
        let mut observations = Vec::with_capacity(total);
        for (idx, (timestamp, pm25)) in history.into_iter().enumerate() {
            if idx % 50 == 0 {
                info!("progress: {}/{} rows", idx, total);
            }
            let weather = self.weather_at(timestamp).into_data();
            observations.push(Observation::labeled(timestamp, pm25, weather)?);
        }
        Ok(observations)
    }
}

/// Write labeled observations as a training CSV.
pub fn write_training_csv(path: &Path, observations: &[Observation]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut wtr = Writer::from_path(path)?;
    let mut header = vec![TIMESTAMP_COLUMN, LABEL_COLUMN];
    header.extend(FEATURE_COLUMNS);
    wtr.write_record(&header)?;

    for obs in observations {
        let mut record = vec![
            obs.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            obs.pm25.map(|v| v.to_string()).unwrap_or_default(),
        ];
        record.extend(
            FEATURE_COLUMNS
                .iter()
                .map(|name| obs.feature(name).map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;

    info!(rows = observations.len(), path = %path.display(), "training dataset written");
    Ok(())
}

/// Source for running without any live provider.
pub struct NoLiveSource;

impl DataSource for NoLiveSource {
    fn historical_pm25(
        &mut self,
        _days: u32,
    ) -> std::result::Result<Vec<(DateTime<Utc>, f64)>, SourceError> {
        Err(SourceError::Unavailable("no live source configured".into()))
    }

    fn weather_at(&mut self, _timestamp: DateTime<Utc>) -> std::result::Result<Weather, SourceError> {
        Err(SourceError::Unavailable("no live source configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct EmptySource;

    impl DataSource for EmptySource {
        fn historical_pm25(
            &mut self,
            _days: u32,
        ) -> std::result::Result<Vec<(DateTime<Utc>, f64)>, SourceError> {
            Ok(Vec::new())
        }

        fn weather_at(&mut self, _ts: DateTime<Utc>) -> std::result::Result<Weather, SourceError> {
            Ok(Weather {
                humidity: 250.0,
                ..Weather::default()
            })
        }
    }

    /// Live feed that reports gaps with sentinel values.
    struct SentinelSource {
        readings: Vec<f64>,
    }

    impl DataSource for SentinelSource {
        fn historical_pm25(
            &mut self,
            _days: u32,
        ) -> std::result::Result<Vec<(DateTime<Utc>, f64)>, SourceError> {
            Ok(self
                .readings
                .iter()
                .enumerate()
                .map(|(i, v)| (end() + chrono::Duration::hours(i as i64), *v))
                .collect())
        }

        fn weather_at(&mut self, _ts: DateTime<Utc>) -> std::result::Result<Weather, SourceError> {
            Ok(Weather::default())
        }
    }

    fn end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn unconfigured_source_falls_back() {
        let mut collector: DataCollector<NoLiveSource> = DataCollector::seeded(None, 1);
        let history = collector.historical_pm25(1, end());
        assert!(matches!(
            history,
            Sourced::Synthetic {
                reason: FallbackReason::NotConfigured,
                ..
            }
        ));
        assert_eq!(history.data().len(), 25);
    }

    #[test]
    fn failing_source_keeps_error_category() {
        let mut collector = DataCollector::seeded(Some(NoLiveSource), 1);
        match collector.weather_at(end()) {
            Sourced::Synthetic {
                reason: FallbackReason::Failed(SourceError::Unavailable(_)),
                data,
            } => assert!(data.validate().is_ok()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_and_malformed_live_data_fall_back() {
        let mut collector = DataCollector::seeded(Some(EmptySource), 1);
        assert!(matches!(
            collector.historical_pm25(2, end()),
            Sourced::Synthetic {
                reason: FallbackReason::Empty,
                ..
            }
        ));
        assert!(matches!(
            collector.weather_at(end()),
            Sourced::Synthetic {
                reason: FallbackReason::Failed(SourceError::Malformed(_)),
                ..
            }
        ));
    }

    #[test]
    fn sentinel_readings_are_dropped_from_live_history() {
        let source = SentinelSource {
            readings: vec![25.0, -999.0, f64::NAN, 31.0],
        };
        let mut collector = DataCollector::seeded(Some(source), 1);

        let history = collector.historical_pm25(1, end());
        assert!(history.is_live());
        let values: Vec<f64> = history.data().iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![25.0, 31.0]);

        let rows = collector.build_training_dataset(1, end()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].weather, Weather::default());
    }

    #[test]
    fn all_sentinel_history_falls_back() {
        let source = SentinelSource {
            readings: vec![-999.0, -999.0],
        };
        let mut collector = DataCollector::seeded(Some(source), 1);
        match collector.historical_pm25(1, end()) {
            Sourced::Synthetic {
                reason: FallbackReason::Failed(SourceError::Malformed(_)),
                data,
            } => assert_eq!(data.len(), 25),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn dataset_rows_are_labeled() {
        let mut collector: DataCollector<NoLiveSource> = DataCollector::seeded(None, 5);
        let rows = collector.build_training_dataset(2, end()).unwrap();
        assert_eq!(rows.len(), 49);
        assert!(rows.iter().all(|r| r.pm25.is_some()));
    }
}
