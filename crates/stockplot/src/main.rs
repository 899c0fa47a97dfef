//! stockplot: fetch daily price history for a list of ticker symbols, derive
//! the requested indicators, and write an HTML dashboard of candlestick
//! charts.
//!
//! Usage:
//!   stockplot
//!   stockplot --symbols-file stocks.csv --indicators MA50,MA200,RSI
//!   stockplot --start-date 2020-01-01 --out dashboard.html

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chart_core::ChartError;
use chrono::NaiveDate;
use indicator_engine::{IndicatorEngine, SENKOU_SPAN_A};
use series_cache::SeriesCache;
use tokio::sync::Semaphore;
use yahoo_client::YahooClient;

mod render;
mod symbols;

const DEFAULT_SYMBOLS_FILE: &str = "stocks.csv";
const DEFAULT_START_DATE: &str = "2018-01-01";
const DEFAULT_INDICATORS: &str = "MA50,MA200";
const DEFAULT_CACHE_DIR: &str = "cache";
const DEFAULT_OUT_FILE: &str = "dashboard.html";
/// Max concurrent symbol pipelines
const DEFAULT_CONCURRENCY: usize = 8;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockplot=info,series_cache=info,yahoo_client=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let symbols_file =
        flag_value(&args, "--symbols-file").unwrap_or_else(|| DEFAULT_SYMBOLS_FILE.to_string());
    let start_date_raw =
        flag_value(&args, "--start-date").unwrap_or_else(|| DEFAULT_START_DATE.to_string());
    let indicators_raw =
        flag_value(&args, "--indicators").unwrap_or_else(|| DEFAULT_INDICATORS.to_string());
    let cache_dir =
        flag_value(&args, "--cache-dir").unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string());
    let out_file = flag_value(&args, "--out").unwrap_or_else(|| DEFAULT_OUT_FILE.to_string());
    let refresh_secs: i64 = flag_value(&args, "--refresh-secs")
        .and_then(|v| v.parse().ok())
        .unwrap_or(series_cache::DEFAULT_REFRESH_INTERVAL_SECS);
    let concurrency: usize = flag_value(&args, "--concurrency")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_CONCURRENCY);

    let start_date = NaiveDate::parse_from_str(&start_date_raw, "%Y-%m-%d")
        .context("start date must be YYYY-MM-DD")?;
    let requested: Vec<String> = indicators_raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let symbols = symbols::read_symbols(Path::new(&symbols_file))?;
    if symbols.is_empty() {
        anyhow::bail!("symbol list {} is empty", symbols_file);
    }

    tracing::info!(
        "stockplot: {} symbols, start={}, indicators={}, cache_dir={}",
        symbols.len(),
        start_date,
        requested.join(","),
        cache_dir
    );

    let cache = Arc::new(
        SeriesCache::new(Arc::new(YahooClient::new()), cache_dir)
            .with_refresh_interval(chrono::Duration::seconds(refresh_secs)),
    );
    let engine = Arc::new(IndicatorEngine::new());
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let mut handles = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let cache = cache.clone();
        let engine = engine.clone();
        let semaphore = semaphore.clone();
        let requested = requested.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let result = process_symbol(&cache, &engine, &symbol, start_date, &requested).await;
            (symbol, result)
        }));
    }

    let mut figures = Vec::new();
    let mut failed: Vec<String> = Vec::new();
    for handle in handles {
        let (symbol, result) = handle.await?;
        match result {
            Ok(figure) => figures.push(figure),
            Err(e) => {
                tracing::error!(symbol = %symbol, error = %e, "skipping symbol");
                failed.push(symbol);
            }
        }
    }

    if figures.is_empty() {
        anyhow::bail!("no symbol produced a chart ({} failed)", failed.len());
    }

    render::write_dashboard(Path::new(&out_file), &figures)?;
    if failed.is_empty() {
        tracing::info!("wrote {} charts to {}", figures.len(), out_file);
    } else {
        tracing::warn!(
            "wrote {} charts to {}; {} symbols failed: {}",
            figures.len(),
            out_file,
            failed.len(),
            failed.join(", ")
        );
    }
    Ok(())
}

/// One symbol, cache check through chart build. Failures here are isolated to
/// the symbol.
async fn process_symbol(
    cache: &SeriesCache,
    engine: &IndicatorEngine,
    symbol: &str,
    start_date: NaiveDate,
    requested: &[String],
) -> Result<render::Figure, ChartError> {
    let series = cache.get_now(symbol, start_date).await?;
    let names: Vec<&str> = requested.iter().map(|s| s.as_str()).collect();
    let enriched = engine.apply(&series, &names)?;
    let cloud = if enriched.has_column(SENKOU_SPAN_A) {
        engine.cloud_segments(&enriched)?
    } else {
        Vec::new()
    };
    Ok(render::figure(symbol, &enriched, &names, &cloud))
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn print_usage() {
    eprintln!("Usage: stockplot [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!(
        "  --symbols-file PATH   Symbol list, one ticker per line (default: {})",
        DEFAULT_SYMBOLS_FILE
    );
    eprintln!(
        "  --start-date DATE     History start, YYYY-MM-DD (default: {})",
        DEFAULT_START_DATE
    );
    eprintln!(
        "  --indicators LIST     Comma-separated indicators, e.g. MA50,MA200,MACD,RSI,BollingerBands,Ichimoku (default: {})",
        DEFAULT_INDICATORS
    );
    eprintln!(
        "  --cache-dir PATH      Snapshot directory (default: {})",
        DEFAULT_CACHE_DIR
    );
    eprintln!(
        "  --refresh-secs N      Snapshot lifetime in seconds (default: {})",
        series_cache::DEFAULT_REFRESH_INTERVAL_SECS
    );
    eprintln!(
        "  --out PATH            Dashboard output file (default: {})",
        DEFAULT_OUT_FILE
    );
    eprintln!(
        "  --concurrency N       Max parallel symbols (default: {})",
        DEFAULT_CONCURRENCY
    );
}
