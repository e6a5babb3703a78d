//! Reduced Ioffe-time distributions.
//!
//! `ITD(p, z) = (M(p, z) / M(p, 0)) * (M(0, 0) / M(0, z))`, where only the
//! numerator switches between real and imaginary parts; the three reference
//! matrix elements are always real.

use std::collections::BTreeMap;

use mela_core::errors::{ErrorInfo, MelaError};
use mela_core::keys::{Channel, Displacement, Momentum, SeriesKey};
use mela_fit::{PlateauFits, SummationFits};
use mela_jack::{ratio, Bins, JackknifeSet};
use mela_ratio::Ratios;
use tracing::{info, warn};

use crate::source::{MatrixElements, PlateauSource, SummationSource};
use crate::spec::{ItdSelection, ItdSpec};

/// Key of one ITD dataset.
pub type ItdKey = (SeriesKey, Channel);

/// `(center / zero_disp) * (zero_mom_zero_disp / zero_mom)` bin by bin.
///
/// A vanishing denominator leaves the bin undefined.
pub fn reduced_itd(
    center: &Bins<f64>,
    zero_disp: &Bins<f64>,
    zero_mom: &Bins<f64>,
    zero_mom_zero_disp: &Bins<f64>,
) -> Result<Bins<f64>, MelaError> {
    let left = center.zip_with(zero_disp, |c, d| ratio(c, d).unwrap_or(f64::NAN))?;
    let right = zero_mom_zero_disp.zip_with(zero_mom, |n, d| ratio(n, d).unwrap_or(f64::NAN))?;
    left.zip_with(&right, |l, r| l * r)
}

/// Distributions of one fit label and the keys that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItdValues {
    /// Evaluated distributions.
    pub values: JackknifeSet<ItdKey, f64>,
    /// Keys whose center or reference matrix element was unavailable.
    pub failures: BTreeMap<ItdKey, MelaError>,
}

fn reference_error(series: &SeriesKey, cause: &MelaError) -> MelaError {
    MelaError::InvalidInput(
        ErrorInfo::new(
            "missing-reference",
            "a reference matrix element of the ITD is unavailable",
        )
        .with_context("key", series.to_string())
        .with_context("cause", cause.to_string()),
    )
}

/// Evaluates the distribution of every series for one matrix-element source.
///
/// A series whose matrix elements are unavailable is recorded in
/// [`ItdValues::failures`]; the other series are still evaluated.
pub fn evaluate_itd(
    series_keys: &[SeriesKey],
    source: &dyn MatrixElements,
) -> Result<ItdValues, MelaError> {
    let mut cache: BTreeMap<ItdKey, Bins<f64>> = BTreeMap::new();
    let mut fetch = |series: SeriesKey, channel: Channel| -> Result<Bins<f64>, MelaError> {
        let key = (series, channel);
        if let Some(bins) = cache.get(&key) {
            return Ok(bins.clone());
        }
        let bins = source.bins(&key.0, key.1)?;
        cache.insert(key, bins.clone());
        Ok(bins)
    };

    let mut out = ItdValues::default();
    for series in series_keys {
        let zero_disp = SeriesKey {
            disp: Displacement::ZERO,
            ..series.clone()
        };
        let zero_mom = SeriesKey {
            mom: Momentum::ZERO,
            ..series.clone()
        };
        let zero_both = SeriesKey {
            mom: Momentum::ZERO,
            disp: Displacement::ZERO,
            ..series.clone()
        };
        let references = (
            fetch(zero_disp, Channel::Re),
            fetch(zero_mom, Channel::Re),
            fetch(zero_both, Channel::Re),
        );
        let (zd, zm, zz) = match references {
            (Ok(zd), Ok(zm), Ok(zz)) => (zd, zm, zz),
            (Err(err), _, _) | (_, Err(err), _) | (_, _, Err(err)) => {
                warn!(key = %series, error = %err, "ITD reference unavailable");
                for channel in Channel::ALL {
                    out.failures
                        .insert((series.clone(), channel), reference_error(series, &err));
                }
                continue;
            }
        };
        for channel in Channel::ALL {
            let outcome =
                fetch(series.clone(), channel).and_then(|center| reduced_itd(&center, &zd, &zm, &zz));
            match outcome {
                Ok(bins) => out.values.insert((series.clone(), channel), bins)?,
                Err(err) => {
                    warn!(key = %series, %channel, error = %err, "ITD evaluation failed");
                    out.failures.insert((series.clone(), channel), err);
                }
            }
        }
    }
    Ok(out)
}

/// Ioffe-time distributions per fit label.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItdSet {
    /// Distributions keyed by fit label.
    pub by_label: BTreeMap<String, JackknifeSet<ItdKey, f64>>,
    /// Keys of each label that could not be evaluated.
    pub failures: BTreeMap<String, BTreeMap<ItdKey, MelaError>>,
}

impl ItdSet {
    /// Evaluates every label of `spec` from the matching fit sequence.
    pub fn evaluate(
        spec: &ItdSpec,
        ratios: &Ratios,
        plateau: &[PlateauFits],
        summation: &[SummationFits],
    ) -> Result<Self, MelaError> {
        let series_keys = ratios.series_keys();
        let mut set = ItdSet::default();
        for (label, selection) in &spec.optimal_fits {
            let unknown = || {
                MelaError::InvalidInput(
                    ErrorInfo::new("unknown-fit-label", "ITD label names no performed fit")
                        .with_context("label", label.clone()),
                )
            };
            let evaluated = match selection {
                ItdSelection::Plateau { tsep, fallback } => {
                    let fits = plateau
                        .iter()
                        .find(|f| f.spec.label == *label)
                        .ok_or_else(unknown)?;
                    let source = PlateauSource {
                        fits,
                        ratios,
                        tsep: *tsep,
                        fallback: *fallback,
                    };
                    evaluate_itd(&series_keys, &source)?
                }
                ItdSelection::Summation { tsep_low } => {
                    let fits = summation
                        .iter()
                        .find(|f| f.spec.label == *label)
                        .ok_or_else(unknown)?;
                    let source = SummationSource {
                        fits,
                        tsep_low: *tsep_low,
                    };
                    evaluate_itd(&series_keys, &source)?
                }
            };
            info!(
                label = %label,
                datasets = evaluated.values.len(),
                failures = evaluated.failures.len(),
                "ITD evaluation completed"
            );
            set.by_label.insert(label.clone(), evaluated.values);
            set.failures.insert(label.clone(), evaluated.failures);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_four_terms() {
        let center = Bins::from_scalars(vec![2.0, 4.0]);
        let zero_disp = Bins::from_scalars(vec![4.0, 4.0]);
        let zero_mom = Bins::from_scalars(vec![0.5, 1.0]);
        let zero_both = Bins::from_scalars(vec![1.0, 1.0]);
        let itd = reduced_itd(&center, &zero_disp, &zero_mom, &zero_both).unwrap();
        assert_eq!(itd.scalars().unwrap(), &[1.0, 1.0]);
    }

    #[test]
    fn vanishing_reference_is_undefined() {
        let one = Bins::from_scalars(vec![1.0, 1.0]);
        let zero = Bins::from_scalars(vec![0.0, 1.0]);
        let itd = reduced_itd(&one, &zero, &one, &one).unwrap();
        assert!(itd.get(0, 0).is_nan());
        assert_eq!(itd.get(1, 0), 1.0);
    }
}
