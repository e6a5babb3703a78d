//! Effective energy `E_eff(b, t) = ln(C(b, t) / C(b, (t + 1) mod Nt))`.

use mela_core::errors::MelaError;
use mela_core::keys::{Momentum, TwoPointKey};
use mela_jack::{ln_ratio, Bins, JackknifeSet};
use num_complex::Complex64;
use tracing::{info, warn};

use crate::twopoint::TwoPointStatistics;

/// Effective energy of the real part of two-point bins, per bin and time.
///
/// Elements whose log argument is zero, negative or non-finite are `NaN`.
pub fn effective_energy_bins(bins: &Bins<Complex64>) -> Bins<f64> {
    let nt = bins.width();
    Bins::from_fn(bins.nbins(), nt, |b, t| {
        ln_ratio(bins.get(b, t).re, bins.get(b, (t + 1) % nt).re).unwrap_or(f64::NAN)
    })
}

fn effective_energy_set<K: Ord + Clone + std::fmt::Debug>(
    level: &str,
    input: &JackknifeSet<K, Complex64>,
) -> Result<JackknifeSet<K, f64>, MelaError> {
    let mut out = JackknifeSet::new();
    for (key, bins, _) in input.iter() {
        let energy = effective_energy_bins(bins);
        let undefined = energy.undefined_count();
        if undefined > 0 {
            warn!(level, key = ?key, undefined, "effective energy undefined for some bins");
        }
        out.insert(key.clone(), energy)?;
    }
    Ok(out)
}

/// Effective energies at every two-point averaging level.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveEnergy {
    /// Temporal extent.
    pub nt: usize,
    /// Per raw key.
    pub plain: JackknifeSet<TwoPointKey, f64>,
    /// Per raw momentum.
    pub averaged: JackknifeSet<Momentum, f64>,
    /// Per plan momentum.
    pub symmetrized: JackknifeSet<Momentum, f64>,
}

impl EffectiveEnergy {
    /// Computes the effective energy bins and their jackknife means.
    pub fn compute(stats: &TwoPointStatistics) -> Result<Self, MelaError> {
        let plain = effective_energy_set("plain", &stats.plain)?;
        let averaged = effective_energy_set("averaged", &stats.averaged)?;
        let symmetrized = effective_energy_set("symmetrized", &stats.symmetrized)?;
        info!(
            momenta = symmetrized.len(),
            nt = stats.nt,
            "effective energy computed"
        );
        Ok(Self {
            nt: stats.nt,
            plain,
            averaged,
            symmetrized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_ratio_is_local() {
        let bins = Bins::new(
            2,
            3,
            vec![
                Complex64::new(4.0, 0.0),
                Complex64::new(2.0, 0.0),
                Complex64::new(1.0, 0.0),
                Complex64::new(4.0, 0.0),
                Complex64::new(-2.0, 0.0),
                Complex64::new(1.0, 0.0),
            ],
        )
        .unwrap();
        let energy = effective_energy_bins(&bins);
        assert!((energy.get(0, 0) - 2f64.ln()).abs() < 1e-15);
        assert!(energy.get(1, 0).is_nan());
        assert!(energy.get(1, 1).is_nan());
        // Wraps around: ln(C(2) / C(0)).
        assert!((energy.get(0, 2) - 0.25f64.ln()).abs() < 1e-15);
        assert_eq!(energy.undefined_count(), 2);
    }
}
