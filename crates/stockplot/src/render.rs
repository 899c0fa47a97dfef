//! Plotly figure construction and dashboard assembly. Pure formatting: every
//! number comes straight out of the enriched series.

use std::path::Path;

use chart_core::{OhlcvSeries, CLOSE, HIGH, LOW, OPEN, VOLUME};
use indicator_engine::{
    CloudSegment, CloudTone, BB_LOWER, BB_MIDDLE, BB_UPPER, CHIKOU_SPAN, KIJUN_SEN,
    SENKOU_SPAN_A, SENKOU_SPAN_B, TENKAN_SEN,
};
use serde_json::{json, Value};

/// One chart, ready to embed.
pub struct Figure {
    pub symbol: String,
    pub spec: Value,
}

/// Build the candlestick + volume figure for one symbol, overlaying the
/// requested indicators and the Ichimoku cloud fills.
pub fn figure(
    symbol: &str,
    series: &OhlcvSeries,
    requested: &[&str],
    cloud: &[CloudSegment],
) -> Figure {
    let dates: Vec<String> = series
        .dates()
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();

    let mut data = vec![json!({
        "type": "candlestick",
        "x": &dates,
        "open": series.column(OPEN),
        "high": series.column(HIGH),
        "low": series.column(LOW),
        "close": series.column(CLOSE),
        "name": "OHLC",
    })];

    for name in requested {
        match *name {
            "MA50" => data.push(line_trace(series, &dates, "MA50", "green")),
            "MA200" => data.push(line_trace(series, &dates, "MA200", "blue")),
            "MA20" => data.push(line_trace(series, &dates, "MA20", "red")),
            "MACD" => data.push(line_trace(series, &dates, "MACD", "purple")),
            "RSI" => data.push(line_trace(series, &dates, "RSI", "orange")),
            "BollingerBands" => add_bollinger_traces(&mut data, series, &dates),
            "Ichimoku" => add_ichimoku_traces(&mut data, series, &dates, cloud),
            _ => {}
        }
    }

    data.push(json!({
        "type": "bar",
        "x": &dates,
        "y": series.column(VOLUME),
        "marker": {"color": "red"},
        "yaxis": "y2",
        "showlegend": false,
    }));

    let layout = json!({
        "title": format!("{} historical price chart", symbol),
        "width": 560,
        "height": 420,
        "margin": {"l": 50, "r": 20, "b": 50, "t": 80, "pad": 5},
        "paper_bgcolor": "LightSteelBlue",
        "plot_bgcolor": "white",
        "xaxis": {"rangeslider": {"visible": false}},
        "yaxis": {"title": "price ($/share)", "domain": [0.25, 1.0]},
        "yaxis2": {"domain": [0.0, 0.18]},
    });

    Figure {
        symbol: symbol.to_string(),
        spec: json!({"data": data, "layout": layout}),
    }
}

fn line_trace(series: &OhlcvSeries, dates: &[String], column: &str, color: &str) -> Value {
    json!({
        "type": "scatter",
        "mode": "lines",
        "x": dates,
        "y": series.column(column),
        "line": {"color": color, "width": 1},
        "name": column,
    })
}

fn add_bollinger_traces(data: &mut Vec<Value>, series: &OhlcvSeries, dates: &[String]) {
    data.push(json!({
        "type": "scatter",
        "mode": "lines",
        "x": dates,
        "y": series.column(BB_UPPER),
        "line": {"color": "rgba(0, 0, 255, 0.2)", "width": 1},
        "name": "Bollinger Bands Upper",
    }));
    data.push(json!({
        "type": "scatter",
        "mode": "lines",
        "x": dates,
        "y": series.column(BB_LOWER),
        "line": {"color": "rgba(0, 0, 255, 0.2)", "width": 1},
        "fill": "tonexty",
        "fillcolor": "rgba(179, 223, 255, 0.3)",
        "name": "Bollinger Bands Lower",
    }));
    data.push(json!({
        "type": "scatter",
        "mode": "lines",
        "x": dates,
        "y": series.column(BB_MIDDLE),
        "line": {"color": "blue", "width": 1},
        "name": "Bollinger Bands Middle",
    }));
}

fn add_ichimoku_traces(
    data: &mut Vec<Value>,
    series: &OhlcvSeries,
    dates: &[String],
    cloud: &[CloudSegment],
) {
    for (column, color) in [
        (TENKAN_SEN, "blue"),
        (KIJUN_SEN, "red"),
        (SENKOU_SPAN_A, "green"),
        (SENKOU_SPAN_B, "orange"),
    ] {
        data.push(line_trace(series, dates, column, color));
    }

    let span_a = series.column(SENKOU_SPAN_A).unwrap_or(&[]);
    let span_b = series.column(SENKOU_SPAN_B).unwrap_or(&[]);
    for (i, segment) in cloud.iter().enumerate() {
        let fill = match segment.tone {
            CloudTone::Bullish => "rgba(0, 200, 0, 0.2)",
            CloudTone::Bearish => "rgba(255, 0, 0, 0.2)",
            CloudTone::Neutral => continue,
        };
        let x = [&dates[i], &dates[i + 1]];
        data.push(json!({
            "type": "scatter",
            "mode": "lines",
            "x": x,
            "y": [span_a[i], span_a[i + 1]],
            "line": {"color": "rgba(255, 255, 255, 0)"},
            "showlegend": false,
            "hoverinfo": "skip",
        }));
        data.push(json!({
            "type": "scatter",
            "mode": "lines",
            "x": x,
            "y": [span_b[i], span_b[i + 1]],
            "fill": "tonexty",
            "fillcolor": fill,
            "line": {"color": "rgba(255, 255, 255, 0)"},
            "showlegend": false,
            "hoverinfo": "skip",
        }));
    }

    data.push(line_trace(series, dates, CHIKOU_SPAN, "lightgrey"));
}

/// Write the single-page dashboard embedding every figure.
pub fn write_dashboard(path: &Path, figures: &[Figure]) -> anyhow::Result<()> {
    let mut html = String::from(
        "<html><head><script src=\"https://cdn.plot.ly/plotly-2.32.0.min.js\"></script></head><body>\n",
    );

    for (i, figure) in figures.iter().enumerate() {
        html.push_str(&format!(
            "  <div id=\"chart_{}\" style=\"display:inline-block\"></div>\n",
            i
        ));
        html.push_str(&format!(
            "  <script>var fig_{i} = {}; Plotly.newPlot(\"chart_{i}\", fig_{i}.data, fig_{i}.layout);</script>\n",
            figure.spec,
            i = i
        ));
    }

    html.push_str("</body></html>\n");
    std::fs::write(path, html)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use indicator_engine::IndicatorEngine;

    fn sample_series(closes: &[f64]) -> OhlcvSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let dates: Vec<NaiveDate> = (0..closes.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        let shifted = |d: f64| -> Vec<Option<f64>> {
            closes.iter().map(|c| Some(c + d)).collect()
        };
        OhlcvSeries::new(
            dates,
            shifted(-0.5),
            shifted(1.0),
            shifted(-1.0),
            closes.iter().copied().map(Some).collect(),
            shifted(1000.0),
        )
        .unwrap()
    }

    #[test]
    fn test_figure_has_candlestick_volume_and_overlays() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let series = sample_series(&closes);
        let engine = IndicatorEngine::new();
        let enriched = engine.apply(&series, &["MA20", "RSI"]).unwrap();

        let figure = figure("AAPL", &enriched, &["MA20", "RSI"], &[]);
        let data = figure.spec["data"].as_array().unwrap();

        // candlestick + MA20 + RSI + volume
        assert_eq!(data.len(), 4);
        assert_eq!(data[0]["type"], "candlestick");
        assert_eq!(data[3]["type"], "bar");
    }

    #[test]
    fn test_unknown_requested_name_adds_no_trace() {
        let series = sample_series(&[100.0, 101.0, 102.0]);
        let figure = figure("AAPL", &series, &["FOO"], &[]);
        let data = figure.spec["data"].as_array().unwrap();

        // candlestick + volume only
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_cloud_fill_traces_skip_neutral_segments() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 + (i % 5) as f64).collect();
        let series = sample_series(&closes);
        let engine = IndicatorEngine::new();
        let enriched = engine.apply(&series, &["Ichimoku"]).unwrap();
        let cloud = engine.cloud_segments(&enriched).unwrap();

        let figure = figure("AAPL", &enriched, &["Ichimoku"], &cloud);
        let data = figure.spec["data"].as_array().unwrap();

        let colored = cloud
            .iter()
            .filter(|s| s.tone != CloudTone::Neutral)
            .count();
        assert!(colored > 0);
        // candlestick + 4 lines + chikou + volume + 2 per colored segment
        assert_eq!(data.len(), 7 + 2 * colored);
    }

    #[test]
    fn test_dashboard_embeds_every_chart() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dashboard.html");
        let series = sample_series(&[100.0, 101.0]);
        let figures = vec![
            figure("AAPL", &series, &[], &[]),
            figure("MSFT", &series, &[], &[]),
        ];

        write_dashboard(&out, &figures).unwrap();
        let html = std::fs::read_to_string(&out).unwrap();
        assert!(html.contains("chart_0"));
        assert!(html.contains("chart_1"));
        assert!(html.contains("Plotly.newPlot"));
    }
}
