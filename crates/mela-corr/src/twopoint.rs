//! Two-point correlator statistics at the plain, operator-averaged and
//! momentum-symmetrized levels.

use std::collections::BTreeMap;

use mela_core::errors::{ErrorInfo, MelaError};
use mela_core::keys::{Displacement, Momentum, TwoPointKey};
use mela_jack::{number_of_bins, JackknifeSet};
use num_complex::Complex64;
use tracing::{debug, info};

use crate::plan::{AnalysisParams, AveragingPlan};
use crate::raw::{average_by, common_ncfg, RawSample, TwoPointData};
use crate::sampling::jackknife_all;
use crate::symmetrize::symmetrize;

/// Averages over source times, operator pairs and rows for each momentum.
pub fn average_two_point(data: &TwoPointData) -> Result<BTreeMap<Momentum, RawSample>, MelaError> {
    average_by(data.samples.iter(), |key: &TwoPointKey| key.mom)
}

/// Symmetrizes operator-averaged data over `+-p` for each plan momentum.
pub fn symmetrize_two_point(
    averaged: &BTreeMap<Momentum, RawSample>,
    plan: &AveragingPlan,
) -> Result<BTreeMap<Momentum, RawSample>, MelaError> {
    let mut out = BTreeMap::new();
    for &mom in plan.momenta() {
        let lookup = |m: Momentum, d: Displacement| {
            if d.is_zero() {
                averaged.get(&m)
            } else {
                None
            }
        };
        let (rule, sample) = symmetrize(mom, Displacement::ZERO, lookup)?;
        debug!(momentum = %mom, ?rule, "symmetrized two-point correlator");
        out.insert(mom, sample);
    }
    Ok(out)
}

/// Jackknife statistics of the two-point function.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoPointStatistics {
    /// Jackknife bins per correlator.
    pub nbins: usize,
    /// Temporal extent.
    pub nt: usize,
    /// One entry per raw key.
    pub plain: JackknifeSet<TwoPointKey, Complex64>,
    /// One entry per raw momentum.
    pub averaged: JackknifeSet<Momentum, Complex64>,
    /// One entry per plan momentum.
    pub symmetrized: JackknifeSet<Momentum, Complex64>,
}

impl TwoPointStatistics {
    /// Runs the three averaging stages and samples each of them.
    pub fn compute(
        data: &TwoPointData,
        plan: &AveragingPlan,
        params: &AnalysisParams,
    ) -> Result<Self, MelaError> {
        params.validate()?;
        let ncfg = common_ncfg(data.samples.values(), "two-point")?;
        let nbins = number_of_bins(ncfg, params.binsize)?;
        let nt = data
            .samples
            .values()
            .next()
            .map(RawSample::nt)
            .unwrap_or_default();
        if let Some((key, sample)) = data.samples.iter().find(|(_, s)| s.nt() != nt) {
            return Err(MelaError::ShapeMismatch(
                ErrorInfo::new("two-point-nt", "two-point samples differ in time extent")
                    .with_context("momentum", key.mom.tag())
                    .with_context("expected", nt.to_string())
                    .with_context("found", sample.nt().to_string()),
            ));
        }

        let averaged_raw = average_two_point(data)?;
        let symmetrized_raw = symmetrize_two_point(&averaged_raw, plan)?;

        let plain = jackknife_all(&data.samples, params.binsize)?;
        let averaged = jackknife_all(&averaged_raw, params.binsize)?;
        let symmetrized = jackknife_all(&symmetrized_raw, params.binsize)?;
        for mom in symmetrized.keys() {
            info!(momentum = %mom, nbins, nt, "two-point jackknife sampling done");
        }
        Ok(Self {
            nbins,
            nt,
            plain,
            averaged,
            symmetrized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mela_core::keys::OperatorPair;

    fn key(mom: Momentum, t0: u32, row: u32) -> TwoPointKey {
        TwoPointKey {
            mom,
            t0,
            ops: OperatorPair::new("N1", "N1"),
            row,
        }
    }

    #[test]
    fn averages_over_nuisance_indices_then_momenta() {
        let p = Momentum::new(0, 0, 1);
        let mut data = TwoPointData::default();
        for (t0, shift) in [(0, 0.0), (4, 2.0)] {
            data.samples.insert(
                key(p, t0, 1),
                RawSample::from_fn(4, 3, |cfg, t| Complex64::new(cfg as f64 + t as f64 + shift, 1.0)),
            );
            data.samples.insert(
                key(p.negated(), t0, 1),
                RawSample::from_fn(4, 3, |cfg, t| Complex64::new(cfg as f64 + t as f64 + shift, -1.0)),
            );
        }
        let plan = AveragingPlan::new([p], []).unwrap();
        let stats = TwoPointStatistics::compute(&data, &plan, &AnalysisParams::new(2).unwrap())
            .unwrap();
        assert_eq!(stats.nbins, 2);
        assert_eq!(stats.nt, 3);
        assert_eq!(stats.plain.len(), 4);
        assert_eq!(stats.averaged.len(), 2);
        let sym = stats.symmetrized.mean(&p).unwrap();
        let avg = stats.averaged.mean(&p).unwrap();
        for t in 0..3 {
            assert!((sym.mean[t] - avg.mean[t]).norm() < 1e-12);
        }
        assert!((sym.mean[0].im - 1.0).abs() < 1e-12);
    }

    #[test]
    fn missing_plan_momentum_is_inconsistent() {
        let mut data = TwoPointData::default();
        data.samples.insert(
            key(Momentum::ZERO, 0, 1),
            RawSample::from_fn(4, 2, |_, _| Complex64::new(1.0, 0.0)),
        );
        let plan = AveragingPlan::new([Momentum::new(1, 0, 0)], []).unwrap();
        let err = TwoPointStatistics::compute(&data, &plan, &AnalysisParams::default()).unwrap_err();
        assert!(matches!(err, MelaError::Inconsistency(_)));
    }
}
