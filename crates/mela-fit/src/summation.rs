//! Summation-method fits: a straight line through the summed ratio versus
//! the source-sink separation.

use std::collections::BTreeMap;
use std::fmt;

use mela_core::errors::{ErrorInfo, MelaError};
use mela_core::keys::{Channel, SeriesKey};
use mela_jack::{estimate, Bins, JackknifeMean};
use mela_ratio::Ratios;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::linear::{fit_linear, linear_model};
use crate::spec::SummationFitSpec;

/// Identifies one summation fit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SummationKey {
    /// Momentum, displacement and insertion.
    pub series: SeriesKey,
    /// Real or imaginary part.
    pub channel: Channel,
    /// Smallest separation in the fit.
    pub tsep_low: u32,
}

impl SummationKey {
    /// Dataset label of the cutoff, e.g. `tL4`.
    pub fn cutoff_label(&self) -> String {
        format!("tL{}", self.tsep_low)
    }
}

impl fmt::Display for SummationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.series, self.channel, self.cutoff_label())
    }
}

/// Model evaluated on a grid with jackknife errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBand {
    /// Abscissae, equally spaced and inclusive of both ends.
    pub x: Vec<f64>,
    /// Model at the jackknife-mean parameters.
    pub mean: Vec<f64>,
    /// Jackknife error of the bin-wise model.
    pub error: Vec<f64>,
}

/// Jackknife linear fit of one series above one cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummationResult {
    /// Separations used, ascending.
    pub separations: Vec<u32>,
    /// Slope `M` per bin; the matrix element.
    pub slope: Bins<f64>,
    /// Jackknife mean and error of the slope.
    pub slope_mean: JackknifeMean<f64>,
    /// Intercept `b` per bin.
    pub intercept: Bins<f64>,
    /// Jackknife mean and error of the intercept.
    pub intercept_mean: JackknifeMean<f64>,
    /// Reduced chi-square per bin.
    pub chi: Bins<f64>,
    /// Jackknife mean and error of the chi-square.
    pub chi_mean: JackknifeMean<f64>,
    /// Error band, when requested.
    pub band: Option<ErrorBand>,
}

/// Equally spaced points over `[lo, hi]`.
pub fn linspace(lo: f64, hi: f64, npoints: usize) -> Vec<f64> {
    match npoints {
        0 => Vec::new(),
        1 => vec![lo],
        n => {
            let step = (hi - lo) / (n - 1) as f64;
            (0..n).map(|i| lo + step * i as f64).collect()
        }
    }
}

/// Evaluates the line on `npoints` points spanning one unit beyond `[xmin, xmax]`.
pub fn error_band(
    slope: &Bins<f64>,
    intercept: &Bins<f64>,
    xmin: f64,
    xmax: f64,
    npoints: usize,
) -> Result<ErrorBand, MelaError> {
    let x = linspace(xmin - 1.0, xmax + 1.0, npoints);
    let nbins = slope.nbins();
    let m = slope.scalars()?;
    let b = intercept.scalars()?;
    let (m_mean, b_mean) = (
        m.iter().sum::<f64>() / nbins as f64,
        b.iter().sum::<f64>() / nbins as f64,
    );
    let model = Bins::from_fn(nbins, x.len(), |bin, i| linear_model(x[i], m[bin], b[bin]));
    let stats = estimate(&model, nbins, x.len())?;
    let mean = x.iter().map(|&xi| linear_model(xi, m_mean, b_mean)).collect();
    Ok(ErrorBand {
        x,
        mean,
        error: stats.error,
    })
}

/// Fits `sum(tsep) = M * tsep + b` bin by bin over the separations `>= tsep_low`.
///
/// `sums` pairs each separation (ascending) with its scalar summed-ratio bins.
pub fn fit_summation(
    sums: &[(u32, &Bins<f64>)],
    tsep_low: u32,
    bands: Option<usize>,
) -> Result<SummationResult, MelaError> {
    let used: Vec<(u32, &Bins<f64>)> = sums
        .iter()
        .filter(|(tsep, _)| *tsep >= tsep_low)
        .map(|&(tsep, bins)| (tsep, bins))
        .collect();
    if used.len() < 2 {
        return Err(MelaError::Fit(
            ErrorInfo::new(
                "too-few-separations",
                "summation fit needs at least two separations above the cutoff",
            )
            .with_context("tsep_low", tsep_low.to_string())
            .with_context("available", used.len().to_string()),
        ));
    }
    let nbins = used[0].1.nbins();
    let x: Vec<f64> = used.iter().map(|(tsep, _)| f64::from(*tsep)).collect();
    let mut err = Vec::with_capacity(used.len());
    let mut columns = Vec::with_capacity(used.len());
    for (_, bins) in &used {
        let values = bins.scalars()?;
        if values.len() != nbins {
            return Err(MelaError::ShapeMismatch(ErrorInfo::new(
                "nbins-mismatch",
                "summed ratios differ in bin count",
            )));
        }
        err.push(estimate(*bins, nbins, 1)?.error[0]);
        columns.push(values);
    }

    let mut slopes = Vec::with_capacity(nbins);
    let mut intercepts = Vec::with_capacity(nbins);
    let mut chis = Vec::with_capacity(nbins);
    let mut y = vec![0.0; used.len()];
    for b in 0..nbins {
        for (slot, column) in y.iter_mut().zip(&columns) {
            *slot = column[b];
        }
        let fit = fit_linear(&x, &y, &err)?;
        slopes.push(fit.slope);
        intercepts.push(fit.intercept);
        chis.push(fit.chi);
    }
    let slope = Bins::from_scalars(slopes);
    let intercept = Bins::from_scalars(intercepts);
    let chi = Bins::from_scalars(chis);
    let band = match bands {
        Some(npoints) => Some(error_band(
            &slope,
            &intercept,
            x[0],
            x[x.len() - 1],
            npoints,
        )?),
        None => None,
    };
    Ok(SummationResult {
        separations: used.iter().map(|(tsep, _)| *tsep).collect(),
        slope_mean: estimate(&slope, nbins, 1)?,
        intercept_mean: estimate(&intercept, nbins, 1)?,
        chi_mean: estimate(&chi, nbins, 1)?,
        slope,
        intercept,
        chi,
        band,
    })
}

/// Summation fits of one labelled fit sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SummationFits {
    /// Fit configuration.
    pub spec: SummationFitSpec,
    /// Successful fits.
    pub results: BTreeMap<SummationKey, SummationResult>,
    /// Keys whose fit failed.
    pub failures: BTreeMap<SummationKey, MelaError>,
}

impl SummationFits {
    /// Fits every series, channel and cutoff independently.
    pub fn run(spec: &SummationFitSpec, ratios: &Ratios) -> Result<Self, MelaError> {
        spec.validate()?;
        let mut jobs = Vec::new();
        for series in ratios.series_keys() {
            for channel in Channel::ALL {
                for &tsep_low in &spec.tsep_low {
                    jobs.push(SummationKey {
                        series: series.clone(),
                        channel,
                        tsep_low,
                    });
                }
            }
        }
        let bands = spec.bands.evaluate.then_some(spec.bands.npoints);
        let outcomes: Vec<(SummationKey, Result<SummationResult, MelaError>)> = jobs
            .into_par_iter()
            .map(|key| {
                let sums: Vec<(u32, &Bins<f64>)> = ratios
                    .separations(&key.series)
                    .into_iter()
                    .filter_map(|tsep| {
                        ratios
                            .sum
                            .bins(&(key.series.with_tsep(tsep), key.channel))
                            .map(|bins| (tsep, bins))
                    })
                    .collect();
                let outcome = fit_summation(&sums, key.tsep_low, bands);
                (key, outcome)
            })
            .collect();

        let mut fits = SummationFits {
            spec: spec.clone(),
            results: BTreeMap::new(),
            failures: BTreeMap::new(),
        };
        for (key, outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    fits.results.insert(key, result);
                }
                Err(err) => {
                    warn!(label = %spec.label, key = %key, error = %err, "summation fit failed");
                    fits.failures.insert(key, err);
                }
            }
        }
        info!(
            label = %spec.label,
            fits = fits.results.len(),
            failures = fits.failures.len(),
            "summation fits completed"
        );
        Ok(fits)
    }

    /// Result for one key.
    pub fn get(&self, key: &SummationKey) -> Option<&SummationResult> {
        self.results.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_both_ends() {
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
    }

    #[test]
    fn recovers_slope_and_band() {
        let m = 0.8;
        let sums: Vec<(u32, Bins<f64>)> = [4u32, 6, 8, 10]
            .iter()
            .map(|&tsep| {
                let bins = Bins::from_fn(5, 1, |b, _| m * f64::from(tsep) + 0.1 + 0.01 * b as f64);
                (tsep, bins)
            })
            .collect();
        let refs: Vec<(u32, &Bins<f64>)> = sums.iter().map(|(t, b)| (*t, b)).collect();
        let result = fit_summation(&refs, 6, Some(5)).unwrap();
        assert_eq!(result.separations, vec![6, 8, 10]);
        let (slope, _) = result.slope_mean.at(0);
        assert!((slope - m).abs() < 1e-10);
        let band = result.band.unwrap();
        assert_eq!(band.x, vec![5.0, 6.5, 8.0, 9.5, 11.0]);
        assert!((band.mean[0] - (m * 5.0 + 0.12)).abs() < 1e-10);
        assert!(band.error.iter().all(|e| e.is_finite()));
    }

    #[test]
    fn single_separation_fails_locally() {
        let bins = Bins::from_scalars(vec![1.0, 2.0]);
        let err = fit_summation(&[(4, &bins)], 4, None).unwrap_err();
        assert!(err.is_local());
    }
}
