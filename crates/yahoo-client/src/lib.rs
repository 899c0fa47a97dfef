use async_trait::async_trait;
use chart_core::{ChartError, OhlcvSeries, QuoteProvider};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart API client. Returns one complete daily series per
/// request; the caller owns caching.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
}

impl YahooClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    /// Send a request with automatic 429 retry.
    async fn send_request(&self, url: &str) -> Result<reqwest::Response, ChartError> {
        for attempt in 0..3u32 {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| ChartError::ProviderUnavailable(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 5u64 * (attempt + 1) as u64;
            tracing::warn!(
                "Yahoo 429 rate limited, waiting {}s before retry {}/3",
                wait_secs,
                attempt + 1
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(ChartError::ProviderUnavailable(
            "Rate limited by Yahoo after 3 retries".to_string(),
        ))
    }

    /// Get daily bars for a symbol over the closed range `[start, end]`.
    pub async fn daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: DateTime<Utc>,
    ) -> Result<OhlcvSeries, ChartError> {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end.timestamp();
        let url = format!(
            "{}/{}?period1={}&period2={}&interval=1d",
            CHART_URL, symbol, period1, period2
        );

        let response = self.send_request(&url).await?;

        if !response.status().is_success() {
            return Err(ChartError::ProviderUnavailable(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let chart_response: ChartResponse = response
            .json()
            .await
            .map_err(|e| ChartError::ProviderUnavailable(e.to_string()))?;

        let result = chart_response
            .chart
            .result
            .into_iter()
            .flatten()
            .next()
            .ok_or_else(|| {
                ChartError::ProviderUnavailable(format!("no chart data for {}", symbol))
            })?;

        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| {
                ChartError::ProviderUnavailable(format!("no quote data for {}", symbol))
            })?;

        let series = build_series(&result.timestamp, &quote)?;
        if series.is_empty() {
            return Err(ChartError::ProviderUnavailable(format!(
                "empty history for {}",
                symbol
            )));
        }

        tracing::debug!(symbol = %symbol, rows = series.len(), "fetched daily history");
        Ok(series)
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteProvider for YahooClient {
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: DateTime<Utc>,
    ) -> Result<OhlcvSeries, ChartError> {
        self.daily_history(symbol, start, end).await
    }
}

/// Collapse the chart payload into a date-indexed series. The live session
/// bar can repeat the last trading day's timestamp; later duplicates of a
/// date are dropped to keep the index strictly increasing.
fn build_series(timestamps: &[i64], quote: &QuoteArrays) -> Result<OhlcvSeries, ChartError> {
    let mut dates: Vec<NaiveDate> = Vec::with_capacity(timestamps.len());
    let mut open = Vec::with_capacity(timestamps.len());
    let mut high = Vec::with_capacity(timestamps.len());
    let mut low = Vec::with_capacity(timestamps.len());
    let mut close = Vec::with_capacity(timestamps.len());
    let mut volume = Vec::with_capacity(timestamps.len());

    for (i, &ts) in timestamps.iter().enumerate() {
        let date = match DateTime::from_timestamp(ts, 0) {
            Some(dt) => dt.date_naive(),
            None => continue,
        };
        if dates.last().is_some_and(|last| *last >= date) {
            continue;
        }
        dates.push(date);
        open.push(cell(&quote.open, i));
        high.push(cell(&quote.high, i));
        low.push(cell(&quote.low, i));
        close.push(cell(&quote.close, i));
        volume.push(cell_u64(&quote.volume, i));
    }

    OhlcvSeries::new(dates, open, high, low, close, volume)
}

fn cell(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

fn cell_u64(values: &[Option<u64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten().map(|v| v as f64)
}

// Response structures
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<QuoteArrays>,
}

#[derive(Debug, Deserialize)]
struct QuoteArrays {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chart_core::{CLOSE, VOLUME};

    #[test]
    fn test_build_series_drops_duplicate_session_bar() {
        // Two bars, then the live bar repeating the last session's day.
        let timestamps = vec![1_672_752_600, 1_672_839_000, 1_672_839_000];
        let quote = QuoteArrays {
            open: vec![Some(1.0), Some(2.0), Some(2.5)],
            high: vec![Some(1.5), Some(2.5), Some(3.0)],
            low: vec![Some(0.5), Some(1.5), Some(2.0)],
            close: vec![Some(1.2), Some(2.2), Some(2.7)],
            volume: vec![Some(100), Some(200), Some(300)],
        };

        let series = build_series(&timestamps, &quote).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.column(CLOSE).unwrap(), &[Some(1.2), Some(2.2)]);
    }

    #[test]
    fn test_build_series_keeps_gaps_as_missing() {
        let timestamps = vec![1_672_752_600, 1_672_839_000];
        let quote = QuoteArrays {
            open: vec![Some(1.0), Some(2.0)],
            high: vec![Some(1.5), Some(2.5)],
            low: vec![Some(0.5), Some(1.5)],
            close: vec![Some(1.2), Some(2.2)],
            volume: vec![Some(100), None],
        };

        let series = build_series(&timestamps, &quote).unwrap();
        assert_eq!(series.column(VOLUME).unwrap(), &[Some(100.0), None]);
    }
}
