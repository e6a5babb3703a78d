//! Three-point correlator statistics.
//!
//! Raw samples span the insertion times `0..tsep` of their separation. The
//! operator average drops source time, operator pair and row; the symmetrized
//! level keys by plan momentum and requested displacement.

use std::collections::{BTreeMap, BTreeSet};

use mela_core::errors::{ErrorInfo, MelaError};
use mela_core::keys::{Displacement, Insertion, Momentum, RatioKey, ThreePointKey};
use mela_jack::{number_of_bins, JackknifeSet};
use num_complex::Complex64;
use tracing::{debug, info};

use crate::plan::{AnalysisParams, AveragingPlan};
use crate::raw::{average_by, common_ncfg, RawSample, ThreePointData};
use crate::sampling::jackknife_all;
use crate::symmetrize::symmetrize;

/// Averages over source times, operator pairs and rows.
pub fn average_three_point(
    data: &ThreePointData,
) -> Result<BTreeMap<RatioKey, RawSample>, MelaError> {
    average_by(data.samples.iter(), ThreePointKey::ratio_key)
}

/// Symmetrizes operator-averaged data for every plan momentum and displacement.
///
/// Separations and insertions are taken from the data available at `+-p`.
pub fn symmetrize_three_point(
    averaged: &BTreeMap<RatioKey, RawSample>,
    plan: &AveragingPlan,
) -> Result<BTreeMap<RatioKey, RawSample>, MelaError> {
    let mut out = BTreeMap::new();
    for &mom in plan.momenta() {
        let partners: BTreeSet<(Insertion, u32)> = averaged
            .keys()
            .filter(|k| k.mom == mom || k.mom == mom.negated())
            .map(|k| (k.insertion.clone(), k.tsep))
            .collect();
        if partners.is_empty() {
            return Err(MelaError::Inconsistency(
                ErrorInfo::new(
                    "no-symmetrization-rule",
                    "averaged momentum has no three-point data at either sign",
                )
                .with_context("momentum", mom.tag()),
            ));
        }
        for &disp in plan.displacements() {
            for (insertion, tsep) in &partners {
                let lookup = |m: Momentum, d: Displacement| {
                    averaged.get(&RatioKey {
                        mom: m,
                        disp: d,
                        insertion: insertion.clone(),
                        tsep: *tsep,
                    })
                };
                let (rule, sample) = symmetrize(mom, disp, lookup).map_err(|err| {
                    err.with_context("insertion", insertion.to_string())
                        .with_context("tsep", tsep.to_string())
                })?;
                debug!(momentum = %mom, %disp, %insertion, tsep, ?rule, "symmetrized three-point correlator");
                out.insert(
                    RatioKey {
                        mom,
                        disp,
                        insertion: insertion.clone(),
                        tsep: *tsep,
                    },
                    sample,
                );
            }
        }
    }
    Ok(out)
}

/// Jackknife statistics of the three-point function.
///
/// Bins are complex; the real and imaginary channels are separated by the
/// consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreePointStatistics {
    /// Jackknife bins per correlator.
    pub nbins: usize,
    /// One entry per raw key.
    pub plain: JackknifeSet<ThreePointKey, Complex64>,
    /// Keyed by raw momentum.
    pub averaged: JackknifeSet<RatioKey, Complex64>,
    /// Keyed by plan momentum.
    pub symmetrized: JackknifeSet<RatioKey, Complex64>,
}

impl ThreePointStatistics {
    /// Runs the three averaging stages and samples each of them.
    pub fn compute(
        data: &ThreePointData,
        plan: &AveragingPlan,
        params: &AnalysisParams,
    ) -> Result<Self, MelaError> {
        params.validate()?;
        let ncfg = common_ncfg(data.samples.values(), "three-point")?;
        let nbins = number_of_bins(ncfg, params.binsize)?;
        for (key, sample) in &data.samples {
            if key.tsep == 0 || sample.nt() != key.tsep as usize {
                return Err(MelaError::ShapeMismatch(
                    ErrorInfo::new(
                        "three-point-extent",
                        "three-point samples must span tsep insertion times",
                    )
                    .with_context("momentum", key.mom.tag())
                    .with_context("tsep", key.tsep.to_string())
                    .with_context("nt", sample.nt().to_string()),
                ));
            }
        }

        let averaged_raw = average_three_point(data)?;
        let symmetrized_raw = symmetrize_three_point(&averaged_raw, plan)?;

        let plain = jackknife_all(&data.samples, params.binsize)?;
        let averaged = jackknife_all(&averaged_raw, params.binsize)?;
        let symmetrized = jackknife_all(&symmetrized_raw, params.binsize)?;
        for &mom in plan.momenta() {
            let count = symmetrized.keys().filter(|k| k.mom == mom).count();
            info!(momentum = %mom, nbins, datasets = count, "three-point jackknife sampling done");
        }
        Ok(Self {
            nbins,
            plain,
            averaged,
            symmetrized,
        })
    }

    /// Separations present in the symmetrized data, ascending.
    pub fn separations(&self) -> Vec<u32> {
        self.symmetrized
            .keys()
            .map(|k| k.tsep)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mela_core::keys::OperatorPair;

    fn key(mom: Momentum, tsep: u32, disp: i32, row: u32) -> ThreePointKey {
        ThreePointKey {
            mom,
            tsep,
            t0: 0,
            disp: Displacement(disp),
            ops: OperatorPair::new("N1", "N1"),
            row,
            insertion: Insertion::new("gt"),
        }
    }

    #[test]
    fn symmetrizes_over_momentum_and_displacement() {
        let p = Momentum::new(0, 0, 1);
        let mut data = ThreePointData::default();
        for (mom, z, im) in [(p, 1, 2.0), (p.negated(), 1, -2.0), (p, -1, -2.0), (p.negated(), -1, 2.0)] {
            for row in [1, 2] {
                data.samples.insert(
                    key(mom, 4, z, row),
                    RawSample::from_fn(6, 4, |cfg, _| Complex64::new(1.0 + cfg as f64, im)),
                );
            }
        }
        let plan = AveragingPlan::new([p], [Displacement(1)]).unwrap();
        let stats =
            ThreePointStatistics::compute(&data, &plan, &AnalysisParams::new(3).unwrap()).unwrap();
        assert_eq!(stats.nbins, 2);
        assert_eq!(stats.averaged.len(), 4);
        assert_eq!(stats.symmetrized.len(), 1);
        assert_eq!(stats.separations(), vec![4]);
        let sym = stats
            .symmetrized
            .mean(&RatioKey {
                mom: p,
                disp: Displacement(1),
                insertion: Insertion::new("gt"),
                tsep: 4,
            })
            .unwrap();
        for t in 0..4 {
            assert!((sym.mean[t].re - 3.5).abs() < 1e-12);
            assert!((sym.mean[t].im - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_samples_not_spanning_the_separation() {
        let mut data = ThreePointData::default();
        data.samples.insert(
            key(Momentum::ZERO, 4, 0, 1),
            RawSample::from_fn(4, 3, |_, _| Complex64::new(1.0, 0.0)),
        );
        let plan = AveragingPlan::new([Momentum::ZERO], []).unwrap();
        let err = ThreePointStatistics::compute(&data, &plan, &AnalysisParams::default()).unwrap_err();
        assert_eq!(err.info().code, "three-point-extent");
    }
}
