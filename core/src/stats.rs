//! Small numeric helpers shared by the projection, Monte Carlo, benchmarking
//! and backtesting code. Every function tolerates empty input.

use statrs::distribution::{ChiSquared, ContinuousCDF};

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divisor n).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Percentile with linear interpolation between closest ranks, `p` in [0, 100].
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Ordinary least squares fit of `y` against its index 0..n.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearTrend {
    pub fn fit(y: &[f64]) -> Self {
        let n = y.len();
        if n == 0 {
            return Self { slope: 0.0, intercept: 0.0 };
        }
        if n == 1 {
            return Self { slope: 0.0, intercept: y[0] };
        }
        let x_mean = (n - 1) as f64 / 2.0;
        let y_mean = mean(y);
        let mut sxy = 0.0;
        let mut sxx = 0.0;
        for (i, v) in y.iter().enumerate() {
            let dx = i as f64 - x_mean;
            sxy += dx * (v - y_mean);
            sxx += dx * dx;
        }
        let slope = sxy / sxx;
        Self {
            slope,
            intercept: y_mean - slope * x_mean,
        }
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// In-sample residuals `y - fitted`.
    pub fn residuals(&self, y: &[f64]) -> Vec<f64> {
        y.iter()
            .enumerate()
            .map(|(i, v)| v - self.predict(i as f64))
            .collect()
    }
}

/// Pearson correlation; `None` when either side has zero variance.
pub fn correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let (ma, mb) = (mean(a), mean(b));
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }
    if va == 0.0 || vb == 0.0 {
        return None;
    }
    Some(cov / (va.sqrt() * vb.sqrt()))
}

pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let errs: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).collect();
    mean(&errs)
}

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let errs: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).collect();
    mean(&errs)
}

/// Coefficient of determination. A constant `actual` series scores 1.0 on a
/// perfect fit and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    let m = mean(actual);
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - m).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Share of period-over-period moves where both series moved the same way.
/// `None` with fewer than two observations.
pub fn directional_accuracy(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let n = actual.len().min(predicted.len());
    if n < 2 {
        return None;
    }
    let hits = (1..n)
        .filter(|&i| sign(actual[i] - actual[i - 1]) == sign(predicted[i] - predicted[i - 1]))
        .count();
    Some(hits as f64 / (n - 1) as f64)
}

/// Jarque-Bera statistic and its chi-squared(2) p-value.
/// `None` below three observations or for a constant series.
pub fn jarque_bera(values: &[f64]) -> Option<(f64, f64)> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let m = mean(values);
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n as f64;
    if m2 == 0.0 {
        return None;
    }
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n as f64;
    let m4 = values.iter().map(|v| (v - m).powi(4)).sum::<f64>() / n as f64;
    let skew = m3 / m2.powf(1.5);
    let kurt = m4 / (m2 * m2);
    let stat = n as f64 / 6.0 * (skew.powi(2) + (kurt - 3.0).powi(2) / 4.0);
    let chi2 = ChiSquared::new(2.0).ok()?;
    Some((stat, 1.0 - chi2.cdf(stat)))
}

/// Durbin-Watson statistic; `None` when every residual is zero.
pub fn durbin_watson(residuals: &[f64]) -> Option<f64> {
    if residuals.len() < 2 {
        return None;
    }
    let denom: f64 = residuals.iter().map(|r| r * r).sum();
    if denom == 0.0 {
        return None;
    }
    let num: f64 = residuals.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    Some(num / denom)
}
