//! The chi-square conventions subtract one point more than the parameter
//! count: `N - 2` for constant fits and `N - 3` for linear fits.

use mela_fit::{fit_constant, fit_linear};
use proptest::prelude::*;

#[test]
fn constant_fit_divides_by_n_minus_two() {
    let data = [1.0, 3.0, 2.0, 2.0];
    let err = [1.0; 4];
    let fit = fit_constant(&data, &err).expect("fit");
    assert!((fit.value - 2.0).abs() < 1e-15);
    let raw: f64 = data.iter().map(|y| (y - 2.0f64).powi(2)).sum();
    assert!((fit.chi - raw / 2.0).abs() < 1e-15);
}

#[test]
fn linear_fit_divides_by_n_minus_three() {
    let x = [1.0, 2.0, 3.0, 4.0, 5.0];
    let y = [1.0, 2.5, 2.8, 4.1, 5.0];
    let fit = fit_linear(&x, &y, &[0.5; 5]).expect("fit");
    let raw: f64 = x
        .iter()
        .zip(y)
        .map(|(&xi, yi)| ((yi - fit.slope * xi - fit.intercept) / 0.5).powi(2))
        .sum();
    assert!((fit.chi - raw / 2.0).abs() < 1e-12);
}

proptest! {
    #[test]
    fn constant_data_fits_exactly(c in -100.0f64..100.0, n in 3usize..20, e in 0.01f64..10.0) {
        let data = vec![c; n];
        let fit = fit_constant(&data, &vec![e; n]).expect("fit");
        prop_assert!((fit.value - c).abs() <= 1e-12 * c.abs().max(1.0));
        prop_assert!(fit.chi.abs() < 1e-12);
    }

    #[test]
    fn linear_data_fits_exactly(m in -5.0f64..5.0, b in -5.0f64..5.0) {
        let x: Vec<f64> = (2..9).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|&v| m * v + b).collect();
        let fit = fit_linear(&x, &y, &[0.1; 7]).expect("fit");
        prop_assert!((fit.slope - m).abs() < 1e-9);
        prop_assert!((fit.intercept - b).abs() < 1e-9);
    }
}
