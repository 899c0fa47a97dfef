//! Rolling and exponential kernels over date-aligned value columns.
//!
//! Every function returns a vector the same length as its input; cells ahead
//! of a kernel's warm-up window are `None`, never fabricated.

/// Trailing mean over `min(window, rows so far)`. Degrades at the head of the
/// series instead of emitting a leading undefined run; a window with no
/// defined values yields `None`.
pub fn rolling_mean_adaptive(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    for i in 0..values.len() {
        let lo = (i + 1).saturating_sub(window);
        let defined: Vec<f64> = values[lo..=i].iter().filter_map(|v| *v).collect();
        if !defined.is_empty() {
            out[i] = Some(defined.iter().sum::<f64>() / defined.len() as f64);
        }
    }
    out
}

/// Trailing mean over a full window; undefined until the window holds
/// `window` defined values.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_apply(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Trailing population standard deviation (ddof = 0) over a full window.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_apply(values, window, |w| {
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let variance = w.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / w.len() as f64;
        variance.sqrt()
    })
}

/// Trailing maximum over a full window.
pub fn rolling_max(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_apply(values, window, |w| {
        w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    })
}

/// Trailing minimum over a full window.
pub fn rolling_min(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_apply(values, window, |w| {
        w.iter().copied().fold(f64::INFINITY, f64::min)
    })
}

fn rolling_apply<F>(values: &[Option<f64>], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    for i in window - 1..values.len() {
        let slice = &values[i + 1 - window..=i];
        let defined: Vec<f64> = slice.iter().filter_map(|v| *v).collect();
        if defined.len() == window {
            out[i] = Some(f(&defined));
        }
    }
    out
}

/// Exponential average. The recursion is seeded at the first defined value
/// and the output is masked until `min_periods` defined observations have
/// been consumed. Missing inputs carry the running state forward.
pub fn ewm(values: &[Option<f64>], alpha: f64, min_periods: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    let mut state: Option<f64> = None;
    let mut seen = 0usize;
    for (i, value) in values.iter().enumerate() {
        if let Some(x) = value {
            state = Some(match state {
                Some(prev) => prev + alpha * (x - prev),
                None => *x,
            });
            seen += 1;
        }
        if seen >= min_periods {
            out[i] = state;
        }
    }
    out
}

/// Exponential average with `alpha = 2 / (span + 1)` and a warm-up mask of
/// `span` defined observations.
pub fn ewm_span(values: &[Option<f64>], span: usize) -> Vec<Option<f64>> {
    ewm(values, 2.0 / (span as f64 + 1.0), span)
}

/// MACD histogram: (EMA_fast − EMA_slow) minus its EMA_signal.
pub fn macd_histogram(
    close: &[Option<f64>],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Vec<Option<f64>> {
    let ema_fast = ewm_span(close, fast);
    let ema_slow = ewm_span(close, slow);
    let line = zip_with(&ema_fast, &ema_slow, |a, b| a - b);
    let signal_line = ewm_span(&line, signal);
    zip_with(&line, &signal_line, |a, b| a - b)
}

/// Relative strength index over `period` using Wilder smoothing
/// (`alpha = 1/period`). Emitted from the first computable row; a zero
/// average loss pins the value at 100. Always within [0, 100].
pub fn rsi(close: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let n = close.len();
    let mut gains = vec![None; n];
    let mut losses = vec![None; n];
    for i in 1..n {
        if let (Some(prev), Some(cur)) = (close[i - 1], close[i]) {
            let change = cur - prev;
            gains[i] = Some(change.max(0.0));
            losses[i] = Some((-change).max(0.0));
        }
    }

    let alpha = 1.0 / period as f64;
    let avg_gain = ewm(&gains, alpha, 1);
    let avg_loss = ewm(&losses, alpha, 1);

    let mut out = vec![None; n];
    for i in 0..n {
        if let (Some(gain), Some(loss)) = (avg_gain[i], avg_loss[i]) {
            out[i] = if loss == 0.0 {
                // Flat history so far carries no strength signal at all.
                if gain == 0.0 {
                    None
                } else {
                    Some(100.0)
                }
            } else {
                Some(100.0 - 100.0 / (1.0 + gain / loss))
            };
        }
    }
    out
}

pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Bollinger bands: trailing mean of `close` ± `width` population standard
/// deviations over the same window.
pub fn bollinger_bands(close: &[Option<f64>], window: usize, width: f64) -> BollingerBands {
    let middle = rolling_mean(close, window);
    let std = rolling_std(close, window);
    let upper = zip_with(&middle, &std, |m, s| m + width * s);
    let lower = zip_with(&middle, &std, |m, s| m - width * s);
    BollingerBands {
        upper,
        middle,
        lower,
    }
}

pub struct IchimokuLines {
    pub tenkan: Vec<Option<f64>>,
    pub kijun: Vec<Option<f64>>,
    pub span_a: Vec<Option<f64>>,
    pub span_b: Vec<Option<f64>>,
    pub chikou: Vec<Option<f64>>,
}

/// Ichimoku lines over high/low/close. Spans are left unshifted (the
/// renderer draws them on the bar's own day); the lagging span is the close
/// pulled back `base` rows with an undefined tail.
pub fn ichimoku(
    high: &[Option<f64>],
    low: &[Option<f64>],
    close: &[Option<f64>],
    conversion: usize,
    base: usize,
    span_b_window: usize,
) -> IchimokuLines {
    let tenkan = midpoint(
        &rolling_max(high, conversion),
        &rolling_min(low, conversion),
    );
    let kijun = midpoint(&rolling_max(high, base), &rolling_min(low, base));
    let span_a = midpoint(&tenkan, &kijun);
    let span_b = midpoint(
        &rolling_max(high, span_b_window),
        &rolling_min(low, span_b_window),
    );
    let chikou = shift_back(close, base);
    IchimokuLines {
        tenkan,
        kijun,
        span_a,
        span_b,
        chikou,
    }
}

/// Pull a column back by `offset` rows: cell `i` takes the value from
/// `i + offset`. Cells that would read past the end stay undefined.
pub fn shift_back(values: &[Option<f64>], offset: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| values.get(i + offset).copied().flatten())
        .collect()
}

fn midpoint(a: &[Option<f64>], b: &[Option<f64>]) -> Vec<Option<f64>> {
    zip_with(a, b, |x, y| (x + y) / 2.0)
}

fn zip_with<F>(a: &[Option<f64>], b: &[Option<f64>], f: F) -> Vec<Option<f64>>
where
    F: Fn(f64, f64) -> f64,
{
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some(f(*x, *y)),
            _ => None,
        })
        .collect()
}
