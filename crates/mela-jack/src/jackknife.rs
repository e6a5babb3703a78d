//! Deletion-d jackknife binning and bias-corrected mean/error estimation.

use mela_core::errors::{ErrorInfo, MelaError};
use serde::{Deserialize, Serialize};

use crate::bins::Bins;
use crate::value::Sample;

fn invalid(code: &str, message: impl Into<String>) -> MelaError {
    MelaError::InvalidInput(ErrorInfo::new(code, message))
}

fn shape(code: &str, message: impl Into<String>) -> MelaError {
    MelaError::ShapeMismatch(ErrorInfo::new(code, message))
}

/// Number of jackknife bins for `ndata` samples in blocks of `binsize`.
///
/// Trailing `ndata % binsize` samples are dropped from every bin.
pub fn number_of_bins(ndata: usize, binsize: usize) -> Result<usize, MelaError> {
    if binsize == 0 {
        return Err(invalid("binsize-zero", "binsize must be positive"));
    }
    if binsize > ndata {
        return Err(MelaError::InvalidInput(
            ErrorInfo::new("binsize-too-large", "binsize exceeds the number of samples")
                .with_context("ndata", ndata.to_string())
                .with_context("binsize", binsize.to_string()),
        ));
    }
    Ok(ndata / binsize)
}

/// Leave-one-block-out averages of a one dimensional series.
///
/// Bin `b` is `(total - block_b) / (ndata - binsize - remainder)`, where the
/// remainder samples at the tail are excluded from `total` up front.
pub fn sample<T: Sample>(series: &[T], nbins: usize, binsize: usize) -> Result<Vec<T>, MelaError> {
    let ndata = series.len();
    let expected = number_of_bins(ndata, binsize)?;
    if nbins != expected {
        return Err(MelaError::ShapeMismatch(
            ErrorInfo::new("nbins-mismatch", "bin count does not match ndata / binsize")
                .with_context("nbins", nbins.to_string())
                .with_context("expected", expected.to_string()),
        ));
    }
    let remainder = ndata % binsize;
    let kept = ndata - binsize - remainder;
    if kept == 0 {
        return Err(invalid(
            "single-bin",
            "jackknife needs at least two bins to leave one out",
        ));
    }
    let norm = 1.0 / kept as f64;

    let total = series[..ndata - remainder]
        .iter()
        .fold(T::zero(), |acc, &v| acc + v);

    let bins = (0..nbins)
        .map(|b| {
            let block = series[b * binsize..(b + 1) * binsize]
                .iter()
                .fold(T::zero(), |acc, &v| acc + v);
            (total - block).scale(norm)
        })
        .collect();
    Ok(bins)
}

/// Samples every column of a configuration-major `ncfg x width` array.
pub fn sample_columns<T: Sample>(
    data: &[T],
    ncfg: usize,
    width: usize,
    binsize: usize,
) -> Result<Bins<T>, MelaError> {
    if data.len() != ncfg * width {
        return Err(shape(
            "raw-shape",
            format!(
                "expected {ncfg} configurations of width {width}, got {} elements",
                data.len()
            ),
        ));
    }
    let nbins = number_of_bins(ncfg, binsize)?;
    let mut columns = Vec::with_capacity(width);
    let mut series = vec![T::zero(); ncfg];
    for t in 0..width {
        for (cfg, slot) in series.iter_mut().enumerate() {
            *slot = data[cfg * width + t];
        }
        columns.push(sample(&series, nbins, binsize)?);
    }
    Bins::from_columns(&columns)
}

/// Jackknife central values and errors, one pair per retained position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JackknifeMean<T> {
    /// Arithmetic mean of the bins at each position.
    pub mean: Vec<T>,
    /// `sqrt((nbins - 1) / nbins * sum (bin - mean)^2)` at each position.
    pub error: Vec<T>,
}

impl<T: Sample> JackknifeMean<T> {
    /// Number of positions.
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    /// True when no positions are held.
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// `(mean, error)` of a scalar estimate, or `None` for wider results.
    pub fn scalar(&self) -> Option<(T, T)> {
        (self.mean.len() == 1).then(|| (self.mean[0], self.error[0]))
    }

    /// `(mean, error)` at position `t`.
    pub fn at(&self, t: usize) -> (T, T) {
        (self.mean[t], self.error[t])
    }
}

/// Jackknife mean and error of `bins` along the bin axis.
///
/// `nspl` is the number of trailing positions; `1` yields a scalar pair.
/// Undefined elements propagate into the mean and error of their position
/// only.
pub fn estimate<T: Sample>(
    bins: &Bins<T>,
    nbins: usize,
    nspl: usize,
) -> Result<JackknifeMean<T>, MelaError> {
    if bins.nbins() != nbins {
        return Err(MelaError::ShapeMismatch(
            ErrorInfo::new(
                "leading-dimension",
                "the sampled dimension of the bins must be the first one",
            )
            .with_context("nbins", nbins.to_string())
            .with_context("leading", bins.nbins().to_string()),
        ));
    }
    if bins.width() != nspl {
        return Err(MelaError::ShapeMismatch(
            ErrorInfo::new("trailing-dimension", "bins width differs from nspl")
                .with_context("nspl", nspl.to_string())
                .with_context("width", bins.width().to_string()),
        ));
    }
    if nbins == 0 {
        return Err(invalid("no-bins", "cannot estimate from zero bins"));
    }
    let fac = (nbins as f64 - 1.0) / nbins as f64;
    let mut mean = Vec::with_capacity(nspl);
    let mut error = Vec::with_capacity(nspl);
    for t in 0..nspl {
        let sum = (0..nbins).fold(T::zero(), |acc, b| acc + bins.get(b, t));
        let ave = sum.scale(1.0 / nbins as f64);
        let sqsum = (0..nbins).fold(T::zero(), |acc, b| {
            acc + (ave - bins.get(b, t)).component_sq()
        });
        mean.push(ave);
        error.push(sqsum.scale(fac).component_sqrt());
    }
    Ok(JackknifeMean { mean, error })
}

/// Scalar convenience wrapper around [`estimate`].
pub fn estimate_scalar<T: Sample>(values: &[T]) -> Result<(T, T), MelaError> {
    let bins = Bins::from_scalars(values.to_vec());
    let result = estimate(&bins, values.len(), 1)?;
    Ok((result.mean[0], result.error[0]))
}
