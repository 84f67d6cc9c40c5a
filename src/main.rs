use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pm25_forecast::config::Config;
use pm25_forecast::data::observation::{Observation, Weather};
use pm25_forecast::data::preprocessing::parse_timestamp;
use pm25_forecast::data::source::{write_training_csv, DataCollector, NoLiveSource};
use pm25_forecast::forecast::{AqiCategory, ForecastSummary, Forecaster};
use pm25_forecast::training::trainer::{Trainer, TrainerConfig};
use pm25_forecast::utils::{input, io as store, plot};

#[derive(Parser)]
#[command(name = "pm25", version, about = "PM2.5 forecasting from weather conditions")]
struct Cli {
    /// JSON config file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the training CSV from PM2.5 history and weather
    Collect {
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Train the model from the training CSV and save it
    Train {
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        model: Option<PathBuf>,
        /// Number of trees in the forest
        #[arg(long, default_value_t = 100)]
        trees: usize,
    },
    /// Predict PM2.5 for a single set of conditions
    Predict {
        #[arg(long)]
        model: Option<PathBuf>,
        /// Time of the observation (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,
        #[command(flatten)]
        weather: WeatherArgs,
    },
    /// Forecast the next 24 hours
    Forecast {
        #[arg(long)]
        model: Option<PathBuf>,
        /// JSON array of hourly weather readings, first entry = current hour
        #[arg(long)]
        feed: Option<PathBuf>,
        /// Write an SVG chart of the forecast
        #[arg(long)]
        plot: Option<PathBuf>,
        /// Print the forecast as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        weather: WeatherArgs,
    },
    /// Show the metrics stored next to the model
    Metrics {
        #[arg(long)]
        model: Option<PathBuf>,
    },
}

#[derive(Args, Default)]
struct WeatherArgs {
    #[arg(long)]
    temperature: Option<f64>,
    #[arg(long)]
    humidity: Option<f64>,
    #[arg(long)]
    pressure: Option<f64>,
    #[arg(long)]
    wind_speed: Option<f64>,
    #[arg(long)]
    wind_direction: Option<f64>,
    #[arg(long)]
    clouds: Option<f64>,
}

impl WeatherArgs {
    fn is_empty(&self) -> bool {
        [
            self.temperature,
            self.humidity,
            self.pressure,
            self.wind_speed,
            self.wind_direction,
            self.clouds,
        ]
        .iter()
        .all(Option::is_none)
    }

    fn over(&self, base: Weather) -> pm25_forecast::Result<Weather> {
        Weather::new(
            self.temperature.unwrap_or(base.temperature),
            self.humidity.unwrap_or(base.humidity),
            self.pressure.unwrap_or(base.pressure),
            self.wind_speed.unwrap_or(base.wind_speed),
            self.wind_direction.unwrap_or(base.wind_direction),
            self.clouds.unwrap_or(base.clouds),
        )
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to read config {}", path.display()))?
            .with_overrides(|key| std::env::var(key).ok()),
        None => Config::from_env(),
    };

    match cli.command {
        Command::Collect { days, output, seed } => {
            let days = days.unwrap_or(config.training_days);
            let output = output.unwrap_or(config.data_path);
            info!(city = %config.city, country = %config.country, days, "building training dataset");

            let mut collector: DataCollector<NoLiveSource> = match seed.or(config.seed) {
                Some(seed) => DataCollector::seeded(None, seed),
                None => DataCollector::new(None),
            };
            let rows = collector.build_training_dataset(days, Utc::now())?;
            write_training_csv(&output, &rows)?;
            println!("Dataset written: {} ({} rows)", output.display(), rows.len());
        }

        Command::Train { data, model, trees } => {
            let data = data.unwrap_or(config.data_path);
            let model_path = model.unwrap_or(config.model_path);

            let mut trainer_config = TrainerConfig::default();
            trainer_config.forest.n_trees = trees;
            let fitted = Trainer::new(trainer_config).train_from_csv(&data)?;
            store::save_model(&model_path, &fitted)?;

            let test = fitted.metrics.test;
            println!("Model trained and saved to {}", model_path.display());
            println!(
                "Test RMSE: {:.2} µg/m³, MAE: {:.2} µg/m³, R²: {:.4}",
                test.rmse, test.mae, test.r2
            );
        }

        Command::Predict { model, at, weather } => {
            let model_path = model.unwrap_or(config.model_path);
            let forecaster = Forecaster::load(&model_path)?;

            let timestamp = match at {
                Some(raw) => parse_timestamp(&raw).with_context(|| format!("invalid timestamp `{}`", raw))?,
                None => Utc::now(),
            };
            let conditions = if weather.is_empty() {
                println!("Enter current weather (blank line keeps the default):");
                let stdin = io::stdin();
                input::prompt_weather(&mut stdin.lock(), &mut io::stdout(), &Weather::default())?
            } else {
                weather.over(Weather::default())?
            };

            let pm25 = forecaster.predict(&Observation::new(timestamp, conditions)?)?;
            println!(
                "Predicted PM2.5: {:.2} µg/m³ ({})",
                pm25,
                AqiCategory::from_pm25(pm25)
            );
        }

        Command::Forecast {
            model,
            feed,
            plot: plot_path,
            json,
            weather,
        } => {
            let model_path = model.unwrap_or(config.model_path);
            let mut forecaster = match config.seed {
                Some(seed) => Forecaster::with_seed(store::load_model(&model_path)?, seed),
                None => Forecaster::load(&model_path)?,
            };

            let now = Utc::now();
            let current = if weather.is_empty() {
                let mut collector: DataCollector<NoLiveSource> = DataCollector::new(None);
                collector.weather_at(now).into_data()
            } else {
                weather.over(Weather::default())?
            };

            let feed: Option<Vec<Weather>> = match feed {
                Some(path) => {
                    let data = fs::read_to_string(&path)
                        .with_context(|| format!("failed to read forecast feed {}", path.display()))?;
                    Some(serde_json::from_str(&data).context("forecast feed is not a JSON array of weather readings")?)
                }
                None => None,
            };

            let points = forecaster.forecast_24h(&current, feed.as_deref(), now)?;

            info!(city = %config.city, country = %config.country, "forecasting next 24 hours");
            if json {
                println!("{}", serde_json::to_string_pretty(&points)?);
            } else {
                println!("24h PM2.5 forecast for {}, {}\n", config.city, config.country);
                println!("{:<18} {:>8}  {:<31} {:>6} {:>6} {:>6}", "time (UTC)", "PM2.5", "category", "°C", "%RH", "m/s");
                for p in &points {
                    println!(
                        "{:<18} {:>8.1}  {:<31} {:>6.1} {:>6.0} {:>6.1}",
                        p.timestamp.format("%Y-%m-%d %H:%M"),
                        p.pm25_predicted,
                        p.category().label(),
                        p.temperature,
                        p.humidity,
                        p.wind_speed
                    );
                }
                if let Some(summary) = ForecastSummary::of(&points) {
                    println!(
                        "\n24h mean: {:.1} µg/m³, max: {:.1}, min: {:.1}",
                        summary.mean, summary.max, summary.min
                    );
                }
            }

            if let Some(path) = plot_path {
                plot::create_forecast_plot(&points, &path)
                    .map_err(|e| anyhow::anyhow!("failed to draw forecast chart: {}", e))?;
                info!(path = %path.display(), "forecast chart written");
            }
        }

        Command::Metrics { model } => {
            let model_path = model.unwrap_or(config.model_path);
            let metrics = store::load_metrics(&model_path)
                .with_context(|| format!("no metrics summary for {}", model_path.display()))?;
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
    }

    Ok(())
}
