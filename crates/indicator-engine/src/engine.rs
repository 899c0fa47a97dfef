use chart_core::{ChartError, OhlcvSeries, CLOSE, HIGH, LOW};
use chrono::NaiveDate;
use serde::Serialize;

use crate::indicators::*;

// Derived column names, matching what the renderer looks up.
pub const BB_UPPER: &str = "BB_upper";
pub const BB_LOWER: &str = "BB_lower";
pub const BB_MIDDLE: &str = "BB_middle";
pub const TENKAN_SEN: &str = "Tenkan_sen";
pub const KIJUN_SEN: &str = "Kijun_sen";
pub const SENKOU_SPAN_A: &str = "Senkou_span_a";
pub const SENKOU_SPAN_B: &str = "Senkou_span_b";
pub const CHIKOU_SPAN: &str = "Chikou_span";

const RSI_PERIOD: usize = 14;
const BB_WINDOW: usize = 20;
const BB_WIDTH: f64 = 2.0;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const ICHIMOKU_CONVERSION: usize = 9;
const ICHIMOKU_BASE: usize = 26;
const ICHIMOKU_SPAN_B: usize = 52;

/// Closed vocabulary of chartable indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Ma20,
    Ma50,
    Ma200,
    Macd,
    Rsi,
    BollingerBands,
    Ichimoku,
}

/// Request-name lookup table. Names outside this table are not indicators.
const VOCABULARY: [(&str, Indicator); 7] = [
    ("MA20", Indicator::Ma20),
    ("MA50", Indicator::Ma50),
    ("MA200", Indicator::Ma200),
    ("MACD", Indicator::Macd),
    ("RSI", Indicator::Rsi),
    ("BollingerBands", Indicator::BollingerBands),
    ("Ichimoku", Indicator::Ichimoku),
];

impl Indicator {
    pub fn parse(name: &str) -> Option<Self> {
        VOCABULARY
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, indicator)| *indicator)
    }

    pub fn name(&self) -> &'static str {
        VOCABULARY
            .iter()
            .find(|(_, indicator)| indicator == self)
            .map(|(n, _)| *n)
            .unwrap_or("")
    }
}

/// Tone of one day-to-day cloud segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CloudTone {
    Bullish,
    Bearish,
    Neutral,
}

/// One segment of the Ichimoku cloud, classified for the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct CloudSegment {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub tone: CloudTone,
}

pub struct IndicatorEngine;

impl IndicatorEngine {
    pub fn new() -> Self {
        Self
    }

    /// Return a copy of `series` with the requested indicator columns
    /// appended, in request order. Unrecognized names are skipped; a repeated
    /// name adds its columns once.
    pub fn apply(
        &self,
        series: &OhlcvSeries,
        requested: &[&str],
    ) -> Result<OhlcvSeries, ChartError> {
        let mut enriched = series.clone();
        for name in requested {
            let Some(indicator) = Indicator::parse(name) else {
                tracing::debug!(indicator = %name, "unrecognized indicator, skipping");
                continue;
            };
            add_indicator(&mut enriched, indicator)?;
        }
        Ok(enriched)
    }

    /// Classify each adjacent day pair of an Ichimoku-enriched series.
    /// Bullish/bearish only when the span relation holds at both endpoints;
    /// a crossover inside the segment (or an undefined endpoint) is neutral.
    pub fn cloud_segments(&self, series: &OhlcvSeries) -> Result<Vec<CloudSegment>, ChartError> {
        let span_a = series.require_column(SENKOU_SPAN_A)?;
        let span_b = series.require_column(SENKOU_SPAN_B)?;
        let dates = series.dates();

        let mut segments = Vec::with_capacity(series.len().saturating_sub(1));
        for i in 1..series.len() {
            let tone = match (span_a[i - 1], span_b[i - 1], span_a[i], span_b[i]) {
                (Some(a0), Some(b0), Some(a1), Some(b1)) if a0 > b0 && a1 > b1 => {
                    CloudTone::Bullish
                }
                (Some(a0), Some(b0), Some(a1), Some(b1)) if a0 < b0 && a1 < b1 => {
                    CloudTone::Bearish
                }
                _ => CloudTone::Neutral,
            };
            segments.push(CloudSegment {
                start: dates[i - 1],
                end: dates[i],
                tone,
            });
        }
        Ok(segments)
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn add_indicator(series: &mut OhlcvSeries, indicator: Indicator) -> Result<(), ChartError> {
    match indicator {
        Indicator::Ma20 => add_moving_average(series, 20),
        Indicator::Ma50 => add_moving_average(series, 50),
        Indicator::Ma200 => add_moving_average(series, 200),
        Indicator::Macd => {
            let close = series.require_column(CLOSE)?.to_vec();
            push_unique(
                series,
                Indicator::Macd.name(),
                macd_histogram(&close, MACD_FAST, MACD_SLOW, MACD_SIGNAL),
            )
        }
        Indicator::Rsi => {
            let close = series.require_column(CLOSE)?.to_vec();
            push_unique(series, Indicator::Rsi.name(), rsi(&close, RSI_PERIOD))
        }
        Indicator::BollingerBands => {
            let close = series.require_column(CLOSE)?.to_vec();
            let bands = bollinger_bands(&close, BB_WINDOW, BB_WIDTH);
            push_unique(series, BB_UPPER, bands.upper)?;
            push_unique(series, BB_LOWER, bands.lower)?;
            push_unique(series, BB_MIDDLE, bands.middle)
        }
        Indicator::Ichimoku => {
            let high = series.require_column(HIGH)?.to_vec();
            let low = series.require_column(LOW)?.to_vec();
            let close = series.require_column(CLOSE)?.to_vec();
            let lines = ichimoku(
                &high,
                &low,
                &close,
                ICHIMOKU_CONVERSION,
                ICHIMOKU_BASE,
                ICHIMOKU_SPAN_B,
            );
            push_unique(series, TENKAN_SEN, lines.tenkan)?;
            push_unique(series, KIJUN_SEN, lines.kijun)?;
            push_unique(series, SENKOU_SPAN_A, lines.span_a)?;
            push_unique(series, SENKOU_SPAN_B, lines.span_b)?;
            push_unique(series, CHIKOU_SPAN, lines.chikou)
        }
    }
}

fn add_moving_average(series: &mut OhlcvSeries, window: usize) -> Result<(), ChartError> {
    let close = series.require_column(CLOSE)?.to_vec();
    let name = format!("MA{}", window);
    push_unique(series, &name, rolling_mean_adaptive(&close, window))
}

fn push_unique(
    series: &mut OhlcvSeries,
    name: &str,
    values: Vec<Option<f64>>,
) -> Result<(), ChartError> {
    if series.has_column(name) {
        return Ok(());
    }
    series.push_column(name, values)
}
