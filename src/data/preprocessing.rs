use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use csv::Reader;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::observation::Observation;
use crate::error::{Pm25Error, Result};

/// Model inputs, in the order the regressor sees them.
pub const FEATURE_COLUMNS: [&str; 9] = [
    "temperature",
    "humidity",
    "pressure",
    "wind_speed",
    "wind_direction",
    "clouds",
    "hour",
    "day_of_week",
    "month",
];

pub const LABEL_COLUMN: &str = "pm25";
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Ordered feature names a model was trained with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        FeatureSchema {
            names: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FeatureSchema {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Schema features that `table` has no column for.
    pub fn missing_from(&self, table: &FeatureTable) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| !table.has_column(name))
            .cloned()
            .collect()
    }

    pub fn validate(&self, table: &FeatureTable) -> Result<()> {
        let missing = self.missing_from(table);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Pm25Error::Schema { missing })
        }
    }
}

/// Column-oriented table of optional numeric cells, addressed by column name.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    columns: HashMap<String, Vec<Option<f64>>>,
    rows: usize,
}

impl FeatureTable {
    /// Build a table from row-major cells. Short rows are padded with empty cells.
    pub fn from_rows<S: AsRef<str>>(headers: &[S], rows: &[Vec<Option<f64>>]) -> Self {
        let mut columns = HashMap::with_capacity(headers.len());
        for (j, header) in headers.iter().enumerate() {
            let values = rows.iter().map(|row| row.get(j).copied().flatten()).collect();
            columns.insert(header.as_ref().to_string(), values);
        }
        FeatureTable {
            columns,
            rows: rows.len(),
        }
    }

    /// Every schema feature plus the label column when any observation carries one.
    pub fn from_observations(observations: &[Observation]) -> Self {
        let mut columns: HashMap<String, Vec<Option<f64>>> = FEATURE_COLUMNS
            .iter()
            .map(|name| {
                let values = observations.iter().map(|obs| obs.feature(name)).collect();
                (name.to_string(), values)
            })
            .collect();

        if observations.iter().any(|obs| obs.pm25.is_some()) {
            let labels = observations.iter().map(|obs| obs.pm25).collect();
            columns.insert(LABEL_COLUMN.to_string(), labels);
        }

        FeatureTable {
            columns,
            rows: observations.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(|c| c.as_slice())
    }

    /// Remove rows with an empty schema feature or label cell.
    ///
    /// Returns the cleaned table and how many rows were discarded.
    pub fn drop_incomplete(&self, schema: &FeatureSchema) -> (FeatureTable, usize) {
        let required: Vec<&Vec<Option<f64>>> = schema
            .names()
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(LABEL_COLUMN))
            .filter_map(|name| self.columns.get(name))
            .collect();

        let keep: Vec<usize> = (0..self.rows)
            .filter(|&i| required.iter().all(|col| col[i].is_some()))
            .collect();

        let columns = self
            .columns
            .iter()
            .map(|(name, values)| (name.clone(), keep.iter().map(|&i| values[i]).collect()))
            .collect();

        let dropped = self.rows - keep.len();
        (
            FeatureTable {
                columns,
                rows: keep.len(),
            },
            dropped,
        )
    }
}

/// Encode the schema features of `table` into an (n × schema.len()) matrix.
///
/// Columns come out in schema order no matter how the table was built.
pub fn encode_features(table: &FeatureTable, schema: &FeatureSchema) -> Result<Array2<f64>> {
    schema.validate(table)?;

    let mut x = Array2::zeros((table.len(), schema.len()));
    for (j, name) in schema.names().iter().enumerate() {
        let column = table
            .column(name)
            .ok_or_else(|| Pm25Error::Schema {
                missing: vec![name.clone()],
            })?;
        for (i, cell) in column.iter().enumerate() {
            x[[i, j]] = cell.ok_or_else(|| Pm25Error::MissingValue {
                row: i,
                column: name.clone(),
            })?;
        }
    }
    Ok(x)
}

/// Encode features and, when the table has a `pm25` column, labels.
pub fn encode(
    table: &FeatureTable,
    schema: &FeatureSchema,
) -> Result<(Array2<f64>, Option<Array1<f64>>)> {
    let x = encode_features(table, schema)?;

    let y = match table.column(LABEL_COLUMN) {
        Some(column) => {
            let labels = column
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    cell.ok_or_else(|| Pm25Error::MissingValue {
                        row: i,
                        column: LABEL_COLUMN.to_string(),
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            Some(Array1::from(labels))
        }
        None => None,
    };

    Ok((x, y))
}

/// Per-feature standardization, fit once on training data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        let mean = x.mean_axis(Axis(0)).ok_or(Pm25Error::InsufficientData {
            rows: 0,
            required: 1,
        })?;
        // Constant features keep their offset but are not rescaled.
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        Ok(StandardScaler { mean, scale })
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }
}

/// Read a training table from CSV.
///
/// Numeric cells that are empty or unparseable become missing. When a
/// row's `timestamp` parses, `hour`, `day_of_week` and `month` are recomputed
/// from it; otherwise the stored calendar columns are kept.
pub fn load_table(csv_path: &Path) -> Result<FeatureTable> {
    if !csv_path.exists() {
        return Err(Pm25Error::DataNotFound {
            path: csv_path.to_path_buf(),
        });
    }

    let file = File::open(csv_path)?;
    let mut rdr = Reader::from_reader(file);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let timestamp_idx = headers.iter().position(|h| h == TIMESTAMP_COLUMN);

    let mut columns: Vec<String> = headers
        .iter()
        .filter(|h| h.as_str() != TIMESTAMP_COLUMN)
        .cloned()
        .collect();
    if timestamp_idx.is_some() {
        for derived in ["hour", "day_of_week", "month"] {
            if !columns.iter().any(|c| c == derived) {
                columns.push(derived.to_string());
            }
        }
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;

        let mut cells: HashMap<&str, Option<f64>> = headers
            .iter()
            .enumerate()
            .filter(|(j, _)| Some(*j) != timestamp_idx)
            .map(|(j, h)| (h.as_str(), record.get(j).and_then(parse_number)))
            .collect();

        if let Some(ts) = timestamp_idx.and_then(|idx| record.get(idx)).and_then(parse_timestamp) {
            cells.insert("hour", Some(ts.hour() as f64));
            cells.insert("day_of_week", Some(ts.weekday().num_days_from_monday() as f64));
            cells.insert("month", Some(ts.month() as f64));
        }

        rows.push(
            columns
                .iter()
                .map(|c| cells.get(c.as_str()).copied().flatten())
                .collect::<Vec<_>>(),
        );
    }

    debug!(rows = rows.len(), columns = columns.len(), "loaded training table");
    Ok(FeatureTable::from_rows(&columns, &rows))
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Accepts RFC 3339 and the `YYYY-MM-DD HH:MM:SS[.f][+HH:MM]` layout.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
