//! Matrix-element bins read from the fit engines.

use mela_core::errors::{ErrorInfo, MelaError};
use mela_core::keys::{Channel, SeriesKey};
use mela_fit::{fit_window, PlateauFits, PlateauWindow, SummationFits, SummationKey};
use mela_jack::Bins;
use mela_ratio::Ratios;
use tracing::warn;

/// Supplies one scalar bin array per series and channel.
pub trait MatrixElements {
    /// Matrix-element bins of `series` in `channel`.
    fn bins(&self, series: &SeriesKey, channel: Channel) -> Result<Bins<f64>, MelaError>;
}

fn missing(what: &str, label: &str, series: &SeriesKey, channel: Channel) -> MelaError {
    MelaError::InvalidInput(
        ErrorInfo::new("missing-matrix-element", format!("no {what} result for key"))
            .with_context("label", label)
            .with_context("key", series.to_string())
            .with_context("channel", channel.as_str()),
    )
}

/// Optimal plateau of a fixed separation, with a fallback range.
#[derive(Debug, Clone, Copy)]
pub struct PlateauSource<'a> {
    /// Plateau fits of the label.
    pub fits: &'a PlateauFits,
    /// Ratios the fits were made on; the fallback refits their plain bins.
    pub ratios: &'a Ratios,
    /// Separation whose plateau is read.
    pub tsep: u32,
    /// Range used when no window met the criterion.
    pub fallback: Option<[usize; 2]>,
}

impl MatrixElements for PlateauSource<'_> {
    fn bins(&self, series: &SeriesKey, channel: Channel) -> Result<Bins<f64>, MelaError> {
        let label = self.fits.spec.label.as_str();
        let key = (series.with_tsep(self.tsep), channel);
        let result = self
            .fits
            .get(&key)
            .ok_or_else(|| missing("plateau fit", label, series, channel))?;
        if let Some(fit) = result.optimal_fit() {
            return Ok(fit.value.clone());
        }
        let [tstart, tstop] = self.fallback.ok_or_else(|| {
            MelaError::InvalidInput(
                ErrorInfo::new(
                    "missing-fallback",
                    "no optimal plateau window and no fallback range configured",
                )
                .with_context("label", label)
                .with_context("key", key.0.to_string())
                .with_context("channel", channel.as_str()),
            )
        })?;
        warn!(label, key = %key.0, %channel, tstart, tstop, "using fallback plateau range");
        let bins = self
            .ratios
            .plain
            .bins(&key)
            .ok_or_else(|| missing("plain ratio", label, series, channel))?;
        let err = &self
            .ratios
            .plain
            .mean(&key)
            .ok_or_else(|| missing("plain ratio", label, series, channel))?
            .error;
        let fit = fit_window(bins, err, PlateauWindow::range(tstart, tstop))?;
        Ok(fit.value)
    }
}

/// Slope of the summation fit above a cutoff.
#[derive(Debug, Clone, Copy)]
pub struct SummationSource<'a> {
    /// Summation fits of the label.
    pub fits: &'a SummationFits,
    /// Cutoff whose fit is read.
    pub tsep_low: u32,
}

impl MatrixElements for SummationSource<'_> {
    fn bins(&self, series: &SeriesKey, channel: Channel) -> Result<Bins<f64>, MelaError> {
        let key = SummationKey {
            series: series.clone(),
            channel,
            tsep_low: self.tsep_low,
        };
        self.fits
            .get(&key)
            .map(|result| result.slope.clone())
            .ok_or_else(|| missing("summation fit", &self.fits.spec.label, series, channel))
    }
}
