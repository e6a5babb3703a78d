//! Constant fits of the effective energy over fixed time ranges.

use std::collections::BTreeMap;

use mela_core::errors::{ErrorInfo, MelaError};
use mela_core::keys::Momentum;
use mela_corr::EffectiveEnergy;
use mela_jack::{estimate, Bins, Sample};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constant::fit_constant;
use crate::plateau::PlateauWindow;
use crate::spec::EffectiveEnergySpec;

/// Constant fit of one momentum's effective energy over one range.
///
/// Bins with an undefined element inside the range are left out; the
/// jackknife mean uses the `nbins_fit` remaining bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyFit {
    /// Fitted range.
    pub window: PlateauWindow,
    /// Bins that entered the fit.
    pub nbins_fit: usize,
    /// Fitted energy per usable bin.
    pub value: Vec<f64>,
    /// Jackknife mean and error of the energy.
    pub mean: (f64, f64),
    /// Jackknife mean and error of the reduced chi-square.
    pub chi: (f64, f64),
}

impl EnergyFit {
    fn undefined(window: PlateauWindow, nbins_fit: usize) -> Self {
        Self {
            window,
            nbins_fit,
            value: Vec::new(),
            mean: (f64::NAN, f64::NAN),
            chi: (f64::NAN, f64::NAN),
        }
    }
}

/// Fits a constant to each usable bin of `bins` over `window`.
pub fn fit_energy_range(bins: &Bins<f64>, window: PlateauWindow) -> Result<EnergyFit, MelaError> {
    if window.tstop >= bins.width() || window.tstart > window.tstop {
        return Err(MelaError::InvalidInput(
            ErrorInfo::new("window-out-of-range", "fit range lies outside the data")
                .with_context("window", window.label())
                .with_context("nt", bins.width().to_string()),
        ));
    }
    let range = window.tstart..=window.tstop;
    let usable: Vec<usize> = (0..bins.nbins())
        .filter(|&b| bins.row(b)[range.clone()].iter().all(|v| v.is_defined()))
        .collect();
    if usable.len() < 2 {
        return Ok(EnergyFit::undefined(window, usable.len()));
    }
    let sub = Bins::from_fn(usable.len(), window.npoints, |i, t| {
        bins.get(usable[i], window.tstart + t)
    });
    let err = estimate(&sub, sub.nbins(), sub.width())?.error;

    let mut values = Vec::with_capacity(usable.len());
    let mut chis = Vec::with_capacity(usable.len());
    for i in 0..sub.nbins() {
        let fit = fit_constant(sub.row(i), &err)?;
        values.push(fit.value);
        chis.push(fit.chi);
    }
    let value_bins = Bins::from_scalars(values.clone());
    let chi_bins = Bins::from_scalars(chis);
    let mean = estimate(&value_bins, usable.len(), 1)?.at(0);
    let chi = estimate(&chi_bins, usable.len(), 1)?.at(0);
    Ok(EnergyFit {
        window,
        nbins_fit: usable.len(),
        value: values,
        mean,
        chi,
    })
}

/// Effective-energy fits of every symmetrized momentum and configured range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnergyFits {
    /// Results keyed by momentum and `(tstart, tstop)`.
    pub results: BTreeMap<(Momentum, (usize, usize)), EnergyFit>,
}

impl EnergyFits {
    /// Runs every configured range on the symmetrized effective energies.
    pub fn run(spec: &EffectiveEnergySpec, energy: &EffectiveEnergy) -> Result<Self, MelaError> {
        spec.validate()?;
        let mut fits = EnergyFits::default();
        for (mom, bins, _) in energy.symmetrized.iter() {
            for &[tstart, tstop] in &spec.fits {
                let fit = fit_energy_range(bins, PlateauWindow::range(tstart, tstop))
                    .map_err(|err| err.with_context("momentum", mom.tag()))?;
                if fit.nbins_fit < bins.nbins() {
                    warn!(
                        momentum = %mom,
                        range = %fit.window.label(),
                        nbins_fit = fit.nbins_fit,
                        nbins = bins.nbins(),
                        "effective energy fit skipped bins with undefined values"
                    );
                }
                info!(
                    momentum = %mom,
                    range = %fit.window.label(),
                    energy = fit.mean.0,
                    error = fit.mean.1,
                    "effective energy fit"
                );
                fits.results.insert((*mom, (tstart, tstop)), fit);
            }
        }
        Ok(fits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_bins_with_undefined_points() {
        let mut bins = Bins::from_fn(4, 8, |b, _| 0.5 + 0.001 * b as f64);
        bins.set(2, 4, f64::NAN);
        let fit = fit_energy_range(&bins, PlateauWindow::range(2, 6)).unwrap();
        assert_eq!(fit.nbins_fit, 3);
        assert_eq!(fit.value.len(), 3);
        let expected = (0.5 + 0.501 + 0.503) / 3.0;
        assert!((fit.mean.0 - expected).abs() < 1e-12);
    }

    #[test]
    fn too_few_bins_is_undefined_not_fatal() {
        let mut bins = Bins::from_fn(2, 6, |_, _| 0.4);
        bins.set(0, 3, f64::NAN);
        let fit = fit_energy_range(&bins, PlateauWindow::range(1, 4)).unwrap();
        assert_eq!(fit.nbins_fit, 1);
        assert!(fit.mean.0.is_nan());
    }
}
