//! Inverse-variance weighted constant fit.

use mela_core::errors::{ErrorInfo, MelaError};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Result of fitting `y = M` to a window of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantFit {
    /// Fitted constant `M`.
    pub value: f64,
    /// `sum ((y_i - M) / err_i)^2 / (N - 2)`.
    pub chi: f64,
}

pub(crate) fn fit_error(code: &str, message: impl Into<String>) -> MelaError {
    MelaError::Fit(ErrorInfo::new(code, message))
}

/// Squared normalised residual; an exact match over a zero error counts as zero.
pub(crate) fn residual_sq(residual: f64, err: f64) -> f64 {
    if err == 0.0 && residual == 0.0 {
        0.0
    } else {
        (residual / err).powi(2)
    }
}

/// Fit weights `1 / err^2`, or uniform weights when any error is zero.
///
/// A window where only some errors vanish is reported with a warning.
pub(crate) fn weights(err: &[f64]) -> Vec<f64> {
    let zeros = err.iter().filter(|&&e| e == 0.0).count();
    if zeros == 0 {
        return err.iter().map(|&e| 1.0 / (e * e)).collect();
    }
    if zeros < err.len() {
        warn!(zeros, points = err.len(), "zero errors in part of the fit window, using uniform weights");
    }
    vec![1.0; err.len()]
}

/// Fits a constant to `data` weighted by `1 / err^2`.
///
/// The degrees of freedom are fixed at `N - 2`, so at least three points are
/// required. A zero error anywhere in the window makes the weights uniform.
pub fn fit_constant(data: &[f64], err: &[f64]) -> Result<ConstantFit, MelaError> {
    if data.len() != err.len() {
        return Err(MelaError::ShapeMismatch(
            ErrorInfo::new("fit-shape", "data and errors differ in length")
                .with_context("data", data.len().to_string())
                .with_context("err", err.len().to_string()),
        ));
    }
    let n = data.len();
    if n < 3 {
        return Err(fit_error(
            "too-few-points",
            format!("constant fit needs at least 3 points, got {n}"),
        ));
    }
    let (sy, s) = data
        .iter()
        .zip(weights(err))
        .fold((0.0, 0.0), |(sy, s), (&y, w)| (sy + y * w, s + w));
    let value = sy / s;
    let chi = data
        .iter()
        .zip(err)
        .map(|(&y, &e)| residual_sq(y - value, e))
        .sum::<f64>()
        / (n - 2) as f64;
    Ok(ConstantFit { value, chi })
}
