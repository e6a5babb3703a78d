//! Weighted least-squares straight line.

use mela_core::errors::{ErrorInfo, MelaError};
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::constant::{fit_error, residual_sq, weights};

/// Result of fitting `y = M * x + b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    /// Slope `M`.
    pub slope: f64,
    /// Intercept `b`.
    pub intercept: f64,
    /// `sum ((y_i - M x_i - b) / err_i)^2 / (N - 3)`; undefined for `N <= 3`.
    pub chi: f64,
}

/// `M * x + b`.
pub fn linear_model(x: f64, slope: f64, intercept: f64) -> f64 {
    intercept + slope * x
}

/// Fits a line through `(x, y)` with weights `1 / err^2`.
///
/// A zero error anywhere makes the weights uniform.
pub fn fit_linear(x: &[f64], y: &[f64], err: &[f64]) -> Result<LinearFit, MelaError> {
    if x.len() != y.len() || y.len() != err.len() {
        return Err(MelaError::ShapeMismatch(
            ErrorInfo::new("fit-shape", "x, y and errors differ in length")
                .with_context("x", x.len().to_string())
                .with_context("y", y.len().to_string())
                .with_context("err", err.len().to_string()),
        ));
    }
    let n = x.len();
    if n < 2 {
        return Err(fit_error(
            "too-few-points",
            format!("linear fit needs at least 2 points, got {n}"),
        ));
    }
    let mut normal = Matrix2::<f64>::zeros();
    let mut rhs = Vector2::<f64>::zeros();
    for (i, w) in weights(err).into_iter().enumerate() {
        normal[(0, 0)] += w * x[i] * x[i];
        normal[(0, 1)] += w * x[i];
        normal[(1, 1)] += w;
        rhs[0] += w * x[i] * y[i];
        rhs[1] += w * y[i];
    }
    normal[(1, 0)] = normal[(0, 1)];
    let inverse = normal
        .try_inverse()
        .ok_or_else(|| fit_error("singular-fit", "normal equations are singular"))?;
    let params = inverse * rhs;
    let (slope, intercept) = (params[0], params[1]);

    let dof = n as i64 - 3;
    let chi = if dof > 0 {
        (0..n)
            .map(|i| residual_sq(y[i] - linear_model(x[i], slope, intercept), err[i]))
            .sum::<f64>()
            / dof as f64
    } else {
        f64::NAN
    };
    Ok(LinearFit {
        slope,
        intercept,
        chi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_line() {
        let x = [2.0, 4.0, 6.0, 8.0, 10.0];
        let y: Vec<f64> = x.iter().map(|&v| 0.7 * v - 0.3).collect();
        let fit = fit_linear(&x, &y, &[0.1; 5]).unwrap();
        assert!((fit.slope - 0.7).abs() < 1e-12);
        assert!((fit.intercept + 0.3).abs() < 1e-12);
        assert!(fit.chi.abs() < 1e-12);
    }

    #[test]
    fn chi_uses_n_minus_three() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [0.0, 1.0, 1.0, 3.0];
        let fit = fit_linear(&x, &y, &[1.0; 4]).unwrap();
        let chi: f64 = x
            .iter()
            .zip(y)
            .map(|(&xi, yi)| (yi - linear_model(xi, fit.slope, fit.intercept)).powi(2))
            .sum();
        assert!((fit.chi - chi / 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_abscissa_is_singular() {
        let err = fit_linear(&[3.0, 3.0], &[1.0, 2.0], &[1.0, 1.0]).unwrap_err();
        assert_eq!(err.info().code, "singular-fit");
    }

    #[test]
    fn partly_zero_errors_keep_the_line_finite() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|&v| 2.0 * v + 1.0).collect();
        let fit = fit_linear(&x, &y, &[0.0, 0.5, 0.5, 1.0]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn two_points_leave_chi_undefined() {
        let fit = fit_linear(&[1.0, 2.0], &[1.0, 2.0], &[1.0, 1.0]).unwrap();
        assert!((fit.slope - 1.0).abs() < 1e-12);
        assert!(fit.chi.is_nan());
    }
}
