//! Small numeric kernels used by the chart builders.

use std::collections::VecDeque;

use serde::Serialize;

/// Trailing simple moving average.
///
/// Entry `i` is the mean of `values[i + 1 - window ..= i]`, or `None` while
/// fewer than `window` points have been seen or when any value in the window
/// is missing. The output has the same length as the input.
pub fn trailing_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    if window > values.len() {
        return vec![None; values.len()];
    }
    let mut buf: VecDeque<Option<f64>> = VecDeque::with_capacity(window);
    let mut sum = 0.0;
    let mut missing = 0usize;
    let mut out = Vec::with_capacity(values.len());

    for &v in values {
        buf.push_back(v);
        match v {
            Some(x) => sum += x,
            None => missing += 1,
        }
        if buf.len() > window {
            match buf.pop_front().flatten() {
                Some(x) => sum -= x,
                None => missing -= 1,
            }
        }
        if buf.len() == window && missing == 0 {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Ordinary least squares fit of `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub n: usize,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a line through `points`. Returns `None` when fewer than two points
/// are given or all x values coincide.
pub fn ols(points: &[(f64, f64)]) -> Option<LinearFit> {
    let (first_x, _) = *points.first()?;
    if points.len() < 2 || points.iter().all(|&(x, _)| x == first_x) {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for &(x, y) in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx <= 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    if !slope.is_finite() || !intercept.is_finite() {
        return None;
    }
    let r_squared = if syy > 0.0 { (sxy * sxy) / (sxx * syy) } else { 1.0 };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
        n: points.len(),
    })
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
