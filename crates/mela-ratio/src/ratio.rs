//! Bin-wise ratio primitives.

use mela_core::errors::{ErrorInfo, MelaError};
use mela_jack::{ratio, Bins};

/// `plain[b, tins] = c3[b, tins] / c2[b, tsep]` for `tins` in `0..tsep`.
///
/// A vanishing two-point denominator makes the affected elements undefined.
pub fn plain_ratio(c3: &Bins<f64>, c2: &Bins<f64>, tsep: usize) -> Result<Bins<f64>, MelaError> {
    if c3.nbins() != c2.nbins() {
        return Err(MelaError::IncompatibleInputs(
            ErrorInfo::new("nbins-mismatch", "two- and three-point bin counts differ")
                .with_context("two_point", c2.nbins().to_string())
                .with_context("three_point", c3.nbins().to_string()),
        ));
    }
    if c3.width() != tsep {
        return Err(MelaError::ShapeMismatch(
            ErrorInfo::new("three-point-extent", "three-point bins must span tsep insertion times")
                .with_context("tsep", tsep.to_string())
                .with_context("width", c3.width().to_string()),
        ));
    }
    if tsep >= c2.width() {
        return Err(MelaError::InvalidInput(
            ErrorInfo::new("tsep-out-of-range", "separation exceeds the two-point time extent")
                .with_context("tsep", tsep.to_string())
                .with_context("nt", c2.width().to_string()),
        ));
    }
    Ok(Bins::from_fn(c3.nbins(), tsep, |b, tins| {
        ratio(c3.get(b, tins), c2.get(b, tsep)).unwrap_or(f64::NAN)
    }))
}

/// `sum[b] = sum over tins in 1..tsep of plain[b, tins]`.
///
/// The source contact term `tins = 0` is always excluded.
pub fn summed_ratio(plain: &Bins<f64>) -> Bins<f64> {
    let values = (0..plain.nbins())
        .map(|b| plain.row(b).iter().skip(1).sum::<f64>())
        .collect();
    Bins::from_scalars(values)
}

/// `(sum_high - sum_low) / (tsep_high - tsep_low)` bin by bin.
pub fn reduced_summed_ratio(
    low: &Bins<f64>,
    high: &Bins<f64>,
    tsep_low: u32,
    tsep_high: u32,
) -> Result<Bins<f64>, MelaError> {
    if tsep_high <= tsep_low {
        return Err(MelaError::InvalidInput(
            ErrorInfo::new("separations-unsorted", "separations must be strictly ascending")
                .with_context("low", tsep_low.to_string())
                .with_context("high", tsep_high.to_string()),
        ));
    }
    let step = f64::from(tsep_high - tsep_low);
    high.zip_with(low, |h, l| (h - l) / step)
}
