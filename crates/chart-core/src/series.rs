use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ChartError;

pub const OPEN: &str = "Open";
pub const HIGH: &str = "High";
pub const LOW: &str = "Low";
pub const CLOSE: &str = "Close";
pub const VOLUME: &str = "Volume";

/// The five columns every provider result must carry.
pub const SOURCE_COLUMNS: [&str; 5] = [OPEN, HIGH, LOW, CLOSE, VOLUME];

/// A named value column aligned 1:1 with the series' date index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Daily OHLCV history for one symbol, column-oriented and keyed by date.
///
/// The date index is strictly increasing with no duplicates. A `None` cell is
/// a provider gap (e.g. missing volume on some days), not an error. Indicator
/// computation never mutates a series in place; it appends columns to a copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OhlcvSeries {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl OhlcvSeries {
    /// Build a series from a date index and the five source columns.
    pub fn new(
        dates: Vec<NaiveDate>,
        open: Vec<Option<f64>>,
        high: Vec<Option<f64>>,
        low: Vec<Option<f64>>,
        close: Vec<Option<f64>>,
        volume: Vec<Option<f64>>,
    ) -> Result<Self, ChartError> {
        Self::from_columns(
            dates,
            vec![
                (OPEN.to_string(), open),
                (HIGH.to_string(), high),
                (LOW.to_string(), low),
                (CLOSE.to_string(), close),
                (VOLUME.to_string(), volume),
            ],
        )
    }

    /// Build a series from an arbitrary column set. The caller is responsible
    /// for including the source columns if the series will feed indicators.
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        columns: Vec<(String, Vec<Option<f64>>)>,
    ) -> Result<Self, ChartError> {
        check_index(&dates)?;
        let mut series = Self {
            dates,
            columns: Vec::with_capacity(columns.len()),
        };
        for (name, values) in columns {
            series.push_column(&name, values)?;
        }
        Ok(series)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Look up a column an indicator depends on. Absence is a contract
    /// violation, not a runtime condition to recover from.
    pub fn require_column(&self, name: &str) -> Result<&[Option<f64>], ChartError> {
        self.column(name)
            .ok_or_else(|| ChartError::MissingColumn(name.to_string()))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Column names in insertion order (source columns first, then derived).
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Append a column. The length must match the date index and the name
    /// must not already be taken.
    pub fn push_column(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<(), ChartError> {
        if values.len() != self.dates.len() {
            return Err(ChartError::InvalidInput(format!(
                "column {} has {} values for {} dates",
                name,
                values.len(),
                self.dates.len()
            )));
        }
        if self.has_column(name) {
            return Err(ChartError::InvalidInput(format!(
                "duplicate column {}",
                name
            )));
        }
        self.columns.push(Column {
            name: name.to_string(),
            values,
        });
        Ok(())
    }

    /// Re-check the construction invariants on a deserialized series. Used by
    /// the cache layer, where a violation means the entry is corrupt.
    pub fn validate(&self) -> Result<(), ChartError> {
        check_index(&self.dates)?;
        for column in &self.columns {
            if column.values.len() != self.dates.len() {
                return Err(ChartError::InvalidInput(format!(
                    "column {} has {} values for {} dates",
                    column.name,
                    column.values.len(),
                    self.dates.len()
                )));
            }
        }
        for name in SOURCE_COLUMNS {
            if !self.has_column(name) {
                return Err(ChartError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }
}

fn check_index(dates: &[NaiveDate]) -> Result<(), ChartError> {
    for pair in dates.windows(2) {
        if pair[1] <= pair[0] {
            return Err(ChartError::InvalidInput(format!(
                "date index not strictly increasing at {}",
                pair[1]
            )));
        }
    }
    Ok(())
}
