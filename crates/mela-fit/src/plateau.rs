//! Plateau fits of the plain ratio with automatic window selection.

use std::collections::BTreeMap;

use mela_core::errors::{ErrorInfo, MelaError};
use mela_jack::{estimate, Bins, JackknifeMean};
use mela_ratio::{RatioChannelKey, Ratios};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constant::fit_constant;
use crate::spec::PlateauFitSpec;

/// An inclusive insertion-time window `[tstart, tstop]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateauWindow {
    /// Points dropped from each end of the interior range.
    pub nf: usize,
    /// First insertion time.
    pub tstart: usize,
    /// Last insertion time.
    pub tstop: usize,
    /// Number of points.
    pub npoints: usize,
}

impl PlateauWindow {
    /// Window over an explicit range, with `nf` set to zero.
    pub fn range(tstart: usize, tstop: usize) -> Self {
        Self {
            nf: 0,
            tstart,
            tstop,
            npoints: tstop.saturating_sub(tstart) + 1,
        }
    }

    /// Dataset label, e.g. `nf1_2-6`.
    pub fn label(&self) -> String {
        format!("nf{}_{}-{}", self.nf, self.tstart, self.tstop)
    }
}

/// Candidate windows for a separation, widest first.
///
/// The interior range `[1, tsep - 1]` shrinks by `nf` points at both ends for
/// `nf = 0 ..= tsep / 2 - 2`. Separations below 4 have no candidates.
pub fn plateau_windows(tsep: usize) -> Vec<PlateauWindow> {
    let nfits = (tsep / 2).saturating_sub(1);
    (0..nfits)
        .map(|nf| {
            let tstart = 1 + nf;
            let tstop = tsep - 1 - nf;
            PlateauWindow {
                nf,
                tstart,
                tstop,
                npoints: tstop - tstart + 1,
            }
        })
        .collect()
}

/// Selected window of a plateau search.
///
/// Persisted as the window index, with `-1` for [`OptimalWindow::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum OptimalWindow {
    /// Index (`nf`) of the first window meeting the criterion.
    Found(usize),
    /// No window met the criterion; callers use an external range.
    NotFound,
}

impl From<OptimalWindow> for i64 {
    fn from(value: OptimalWindow) -> Self {
        match value {
            OptimalWindow::Found(nf) => nf as i64,
            OptimalWindow::NotFound => -1,
        }
    }
}

impl From<i64> for OptimalWindow {
    fn from(value: i64) -> Self {
        usize::try_from(value)
            .map(OptimalWindow::Found)
            .unwrap_or(OptimalWindow::NotFound)
    }
}

/// Jackknife constant fit over one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowFit {
    /// Window fitted.
    pub window: PlateauWindow,
    /// Fitted constant per bin.
    pub value: Bins<f64>,
    /// Jackknife mean and error of the constant.
    pub value_mean: JackknifeMean<f64>,
    /// Reduced chi-square per bin.
    pub chi: Bins<f64>,
    /// Jackknife mean and error of the chi-square.
    pub chi_mean: JackknifeMean<f64>,
}

impl WindowFit {
    /// `(mean, error)` of the fitted constant.
    pub fn value(&self) -> (f64, f64) {
        self.value_mean.at(0)
    }

    /// Jackknife mean of the reduced chi-square.
    pub fn chi(&self) -> f64 {
        self.chi_mean.mean[0]
    }
}

/// Fits a constant to every bin over `window`, weighting by `err`.
///
/// `err` holds the jackknife error of every position of `bins`.
pub fn fit_window(
    bins: &Bins<f64>,
    err: &[f64],
    window: PlateauWindow,
) -> Result<WindowFit, MelaError> {
    if err.len() != bins.width() {
        return Err(MelaError::ShapeMismatch(
            ErrorInfo::new("fit-shape", "errors do not cover every position of the bins")
                .with_context("width", bins.width().to_string())
                .with_context("err", err.len().to_string()),
        ));
    }
    if window.tstart > window.tstop || window.tstop >= bins.width() {
        return Err(MelaError::InvalidInput(
            ErrorInfo::new("window-out-of-range", "fit window lies outside the data")
                .with_context("window", window.label())
                .with_context("width", bins.width().to_string()),
        ));
    }
    let range = window.tstart..=window.tstop;
    let mut values = Vec::with_capacity(bins.nbins());
    let mut chis = Vec::with_capacity(bins.nbins());
    for b in 0..bins.nbins() {
        let fit = fit_constant(&bins.row(b)[range.clone()], &err[range.clone()])?;
        values.push(fit.value);
        chis.push(fit.chi);
    }
    let value = Bins::from_scalars(values);
    let chi = Bins::from_scalars(chis);
    let value_mean = estimate(&value, value.nbins(), 1)?;
    let chi_mean = estimate(&chi, chi.nbins(), 1)?;
    Ok(WindowFit {
        window,
        value,
        value_mean,
        chi,
        chi_mean,
    })
}

/// All candidate window fits of one ratio and the selected window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateauResult {
    /// One entry per candidate, widest first.
    pub windows: Vec<WindowFit>,
    /// First window whose mean chi-square is within the criterion.
    pub optimal: OptimalWindow,
}

impl PlateauResult {
    /// The selected window fit, if any.
    pub fn optimal_fit(&self) -> Option<&WindowFit> {
        match self.optimal {
            OptimalWindow::Found(nf) => self.windows.get(nf),
            OptimalWindow::NotFound => None,
        }
    }
}

/// Fits every candidate window of a `tsep`-wide plain ratio.
///
/// The widest acceptable window wins even when a narrower one has a lower
/// chi-square.
pub fn fit_plateau(
    bins: &Bins<f64>,
    err: &[f64],
    chi_criterion: f64,
) -> Result<PlateauResult, MelaError> {
    let mut windows = Vec::new();
    let mut optimal = OptimalWindow::NotFound;
    for window in plateau_windows(bins.width()) {
        let fit = fit_window(bins, err, window)?;
        if optimal == OptimalWindow::NotFound && fit.chi() <= chi_criterion {
            optimal = OptimalWindow::Found(window.nf);
        }
        windows.push(fit);
    }
    Ok(PlateauResult { windows, optimal })
}

/// Plateau fits of one labelled fit sequence over every ratio key.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateauFits {
    /// Fit configuration.
    pub spec: PlateauFitSpec,
    /// Successful fits.
    pub results: BTreeMap<RatioChannelKey, PlateauResult>,
    /// Keys whose fit failed; the remaining keys are unaffected.
    pub failures: BTreeMap<RatioChannelKey, MelaError>,
}

impl PlateauFits {
    /// Fits the plain ratio of every key independently.
    pub fn run(spec: &PlateauFitSpec, ratios: &Ratios) -> Result<Self, MelaError> {
        spec.validate()?;
        let entries: Vec<_> = ratios.plain.iter().collect();
        let outcomes: Vec<(RatioChannelKey, Result<PlateauResult, MelaError>)> = entries
            .par_iter()
            .map(|(key, bins, mean)| {
                let outcome = fit_plateau(bins, &mean.error, spec.chi_criterion);
                ((*key).clone(), outcome)
            })
            .collect();

        let mut fits = PlateauFits {
            spec: spec.clone(),
            results: BTreeMap::new(),
            failures: BTreeMap::new(),
        };
        for ((key, channel), outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    match result.optimal {
                        OptimalWindow::Found(nf) => {
                            debug!(label = %spec.label, key = %key, %channel, nf, "optimal plateau window")
                        }
                        OptimalWindow::NotFound => {
                            warn!(label = %spec.label, key = %key, %channel, "no plateau window meets the chi-square criterion")
                        }
                    }
                    fits.results.insert((key, channel), result);
                }
                Err(err) => {
                    warn!(label = %spec.label, key = %key, %channel, error = %err, "plateau fit failed");
                    fits.failures.insert((key, channel), err);
                }
            }
        }
        info!(
            label = %spec.label,
            fits = fits.results.len(),
            failures = fits.failures.len(),
            "plateau fits completed"
        );
        Ok(fits)
    }

    /// Result for one ratio key and channel.
    pub fn get(&self, key: &RatioChannelKey) -> Option<&PlateauResult> {
        self.results.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_shrink_symmetrically() {
        let windows = plateau_windows(8);
        let labels: Vec<String> = windows.iter().map(PlateauWindow::label).collect();
        assert_eq!(labels, vec!["nf0_1-7", "nf1_2-6", "nf2_3-5"]);
        assert_eq!(windows[2].npoints, 3);
        assert!(plateau_windows(3).is_empty());
        assert_eq!(plateau_windows(5).len(), 1);
    }

    #[test]
    fn sentinel_round_trips_through_integers() {
        assert_eq!(i64::from(OptimalWindow::NotFound), -1);
        assert_eq!(OptimalWindow::from(2), OptimalWindow::Found(2));
        let json = serde_json::to_string(&OptimalWindow::NotFound).unwrap();
        assert_eq!(json, "-1");
    }

    #[test]
    fn no_window_below_criterion() {
        // Alternating data with tiny errors cannot fit a constant.
        let bins = Bins::from_fn(4, 6, |b, t| {
            let base = if t % 2 == 0 { 1.0 } else { 2.0 };
            base + 0.01 * b as f64
        });
        let result = fit_plateau(&bins, &[0.01; 6], 1.0).unwrap();
        assert_eq!(result.optimal, OptimalWindow::NotFound);
        assert!(result.optimal_fit().is_none());
        assert_eq!(result.windows.len(), 2);
    }

    #[test]
    fn window_outside_data_is_rejected() {
        let bins = Bins::<f64>::zeros(2, 4);
        let err = fit_window(&bins, &[1.0; 4], PlateauWindow::range(1, 4)).unwrap_err();
        assert_eq!(err.info().code, "window-out-of-range");
    }
}
