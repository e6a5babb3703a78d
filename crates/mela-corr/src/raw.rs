//! Per-configuration correlator measurements as delivered by a data source.

use std::collections::BTreeMap;

use mela_core::errors::{ErrorInfo, MelaError};
use mela_core::keys::{ThreePointKey, TwoPointKey};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Complex correlator values indexed by `(configuration, time)`.
///
/// Stored configuration-major. Immutable once loaded; the aggregation stages
/// build new samples rather than editing these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    ncfg: usize,
    nt: usize,
    data: Vec<Complex64>,
}

impl RawSample {
    /// Wraps configuration-major data of `ncfg x nt` values.
    pub fn new(ncfg: usize, nt: usize, data: Vec<Complex64>) -> Result<Self, MelaError> {
        if ncfg == 0 || nt == 0 {
            return Err(MelaError::invalid(
                "raw-empty",
                "raw samples need at least one configuration and one time slice",
            ));
        }
        if data.len() != ncfg * nt {
            return Err(MelaError::ShapeMismatch(
                ErrorInfo::new("raw-shape", "raw sample length differs from ncfg * nt")
                    .with_context("ncfg", ncfg.to_string())
                    .with_context("nt", nt.to_string())
                    .with_context("len", data.len().to_string()),
            ));
        }
        Ok(Self { ncfg, nt, data })
    }

    /// Builds a sample from a function of `(cfg, t)`.
    pub fn from_fn(ncfg: usize, nt: usize, mut f: impl FnMut(usize, usize) -> Complex64) -> Self {
        let mut data = Vec::with_capacity(ncfg * nt);
        for cfg in 0..ncfg {
            for t in 0..nt {
                data.push(f(cfg, t));
            }
        }
        Self { ncfg, nt, data }
    }

    /// Number of gauge configurations.
    pub fn ncfg(&self) -> usize {
        self.ncfg
    }

    /// Number of time slices per configuration.
    pub fn nt(&self) -> usize {
        self.nt
    }

    /// Value at configuration `cfg`, time `t`.
    pub fn get(&self, cfg: usize, t: usize) -> Complex64 {
        self.data[cfg * self.nt + t]
    }

    /// Configuration-major view of all values.
    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    pub(crate) fn zeros_like(&self) -> Self {
        Self {
            ncfg: self.ncfg,
            nt: self.nt,
            data: vec![Complex64::new(0.0, 0.0); self.data.len()],
        }
    }

    pub(crate) fn same_shape(&self, other: &RawSample) -> bool {
        self.ncfg == other.ncfg && self.nt == other.nt
    }

    /// Adds `other`, multiplying its imaginary part by `im_sign`.
    pub(crate) fn accumulate(&mut self, other: &RawSample, im_sign: f64) {
        for (acc, v) in self.data.iter_mut().zip(other.data.iter()) {
            acc.re += v.re;
            acc.im += im_sign * v.im;
        }
    }

    pub(crate) fn scale(&mut self, factor: f64) {
        for v in self.data.iter_mut() {
            *v *= factor;
        }
    }
}

/// Raw two-point measurements of one ensemble.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TwoPointData {
    /// Samples keyed by momentum, source time, operators and row.
    pub samples: BTreeMap<TwoPointKey, RawSample>,
}

/// Raw three-point measurements of one ensemble.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreePointData {
    /// Samples keyed by momentum, separation, source time, displacement,
    /// operators, row and insertion. Each sample spans `tsep` insertion times.
    pub samples: BTreeMap<ThreePointKey, RawSample>,
}

/// Averages samples sharing a group key, dividing each group by its size.
pub(crate) fn average_by<'a, K: 'a, G: Ord + Clone>(
    samples: impl Iterator<Item = (&'a K, &'a RawSample)>,
    group: impl Fn(&K) -> G,
) -> Result<BTreeMap<G, RawSample>, MelaError> {
    let mut sums: BTreeMap<G, (RawSample, usize)> = BTreeMap::new();
    for (key, sample) in samples {
        let entry = sums
            .entry(group(key))
            .or_insert_with(|| (sample.zeros_like(), 0));
        if !entry.0.same_shape(sample) {
            return Err(MelaError::ShapeMismatch(
                ErrorInfo::new(
                    "average-shape",
                    "samples averaged together differ in ncfg or time extent",
                )
                .with_context("expected", format!("{}x{}", entry.0.ncfg(), entry.0.nt()))
                .with_context("found", format!("{}x{}", sample.ncfg(), sample.nt())),
            ));
        }
        entry.0.accumulate(sample, 1.0);
        entry.1 += 1;
    }
    Ok(sums
        .into_iter()
        .map(|(group, (mut total, count))| {
            total.scale(1.0 / count as f64);
            (group, total)
        })
        .collect())
}

/// Checks that every sample has `ncfg` configurations and returns it.
pub(crate) fn common_ncfg<'a>(
    mut samples: impl Iterator<Item = &'a RawSample>,
    what: &str,
) -> Result<usize, MelaError> {
    let first = samples.next().ok_or_else(|| {
        MelaError::invalid("no-samples", format!("no {what} samples were loaded"))
    })?;
    let ncfg = first.ncfg();
    for sample in samples {
        if sample.ncfg() != ncfg {
            return Err(MelaError::ShapeMismatch(
                ErrorInfo::new("ncfg-mismatch", format!("{what} samples differ in ncfg"))
                    .with_context("expected", ncfg.to_string())
                    .with_context("found", sample.ncfg().to_string()),
            ));
        }
    }
    Ok(ncfg)
}
