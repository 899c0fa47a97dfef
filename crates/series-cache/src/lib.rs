//! Per-symbol persisted snapshots of daily price history.
//!
//! One JSON file per symbol under the cache directory. A snapshot is served
//! as long as it is younger than the refresh interval and covers the
//! requested start date; anything else falls through to the provider and
//! overwrites the file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chart_core::{ChartError, OhlcvSeries, QuoteProvider};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Default snapshot lifetime: 3 hours.
pub const DEFAULT_REFRESH_INTERVAL_SECS: i64 = 10_800;

/// One persisted snapshot: the fetched series plus the bookkeeping needed for
/// freshness and range-coverage checks. The stamp lives inside the entry so
/// a copied cache directory keeps its freshness semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub symbol: String,
    pub saved_at: DateTime<Utc>,
    pub start_date: NaiveDate,
    pub series: OhlcvSeries,
}

pub struct SeriesCache {
    provider: Arc<dyn QuoteProvider>,
    cache_dir: PathBuf,
    refresh_interval: Duration,
}

impl SeriesCache {
    pub fn new(provider: Arc<dyn QuoteProvider>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            cache_dir: cache_dir.into(),
            refresh_interval: Duration::seconds(DEFAULT_REFRESH_INTERVAL_SECS),
        }
    }

    /// Override the snapshot lifetime.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Fetch the series for `symbol` as of the current wall clock.
    pub async fn get_now(
        &self,
        symbol: &str,
        start_date: NaiveDate,
    ) -> Result<OhlcvSeries, ChartError> {
        self.get(symbol, start_date, Utc::now()).await
    }

    /// Fetch the series for `symbol` from `start_date` through `as_of`,
    /// serving the persisted snapshot when it is fresh enough.
    pub async fn get(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        as_of: DateTime<Utc>,
    ) -> Result<OhlcvSeries, ChartError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ChartError::InvalidInput("empty symbol".to_string()));
        }
        if start_date.and_time(NaiveTime::MIN).and_utc() > as_of {
            return Err(ChartError::InvalidInput(format!(
                "start date {} is after {}",
                start_date, as_of
            )));
        }

        let path = self.entry_path(&symbol);
        if path.exists() {
            match read_entry(&path) {
                Ok(entry) => {
                    let age = as_of - entry.saved_at;
                    if age < self.refresh_interval && entry.start_date <= start_date {
                        tracing::debug!(
                            symbol = %symbol,
                            age_secs = age.num_seconds(),
                            "cache hit"
                        );
                        return Ok(entry.series);
                    }
                    tracing::debug!(
                        symbol = %symbol,
                        age_secs = age.num_seconds(),
                        "snapshot stale or range not covered, refetching"
                    );
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "unreadable snapshot, refetching");
                }
            }
        }

        let series = self.provider.fetch(&symbol, start_date, as_of).await?;
        if series.is_empty() {
            return Err(ChartError::ProviderUnavailable(format!(
                "empty history for {}",
                symbol
            )));
        }

        let entry = CacheEntry {
            symbol: symbol.clone(),
            saved_at: as_of,
            start_date,
            series,
        };
        if let Err(e) = self.write_entry(&entry) {
            // A failed persist costs a refetch next run, nothing more.
            tracing::warn!(symbol = %symbol, error = %e, "failed to persist snapshot");
        }
        Ok(entry.series)
    }

    /// Read the persisted snapshot for a symbol without any freshness check.
    /// Unlike `get`, a damaged entry surfaces as `CacheCorrupt` here.
    pub fn load_entry(&self, symbol: &str) -> Result<CacheEntry, ChartError> {
        read_entry(&self.entry_path(&symbol.trim().to_uppercase()))
    }

    fn entry_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.cache", symbol))
    }

    fn write_entry(&self, entry: &CacheEntry) -> Result<(), ChartError> {
        std::fs::create_dir_all(&self.cache_dir).map_err(|e| ChartError::Io(e.to_string()))?;

        let path = self.entry_path(&entry.symbol);
        let tmp = path.with_extension("cache.tmp");
        let json = serde_json::to_vec(entry).map_err(|e| ChartError::Io(e.to_string()))?;

        // Write-to-temp-then-rename so concurrent readers never observe a
        // partially written entry.
        std::fs::write(&tmp, json).map_err(|e| ChartError::Io(e.to_string()))?;
        std::fs::rename(&tmp, &path).map_err(|e| ChartError::Io(e.to_string()))?;
        Ok(())
    }
}

fn read_entry(path: &Path) -> Result<CacheEntry, ChartError> {
    let raw = std::fs::read(path).map_err(|e| ChartError::CacheCorrupt(e.to_string()))?;
    let entry: CacheEntry =
        serde_json::from_slice(&raw).map_err(|e| ChartError::CacheCorrupt(e.to_string()))?;
    entry
        .series
        .validate()
        .map_err(|e| ChartError::CacheCorrupt(e.to_string()))?;
    Ok(entry)
}
