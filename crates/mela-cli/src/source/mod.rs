//! Raw correlator sources.

pub mod ascii;
pub mod synthetic;

use mela_core::errors::MelaError;
use mela_corr::{ThreePointData, TwoPointData};
use tracing::info;

use crate::config::{RunConfig, SourceConfig};

/// Raw two- and three-point data of one ensemble.
#[derive(Debug, Clone)]
pub struct RawEnsemble {
    /// Number of gauge configurations.
    pub ncfg: usize,
    /// Seed of a synthetic ensemble.
    pub seed: Option<u64>,
    /// Two-point samples.
    pub two_point: TwoPointData,
    /// Three-point samples; empty when the run has no three-point section.
    pub three_point: ThreePointData,
}

/// Reads or generates the ensemble described by `config`.
pub fn load(config: &RunConfig) -> Result<RawEnsemble, MelaError> {
    let nt = config.two_point.nt;
    let ensemble = match &config.source {
        SourceConfig::Ascii { manifest } => {
            let (ncfg, two_point, three_point) = ascii::load(manifest, nt)?;
            RawEnsemble {
                ncfg,
                seed: None,
                two_point,
                three_point,
            }
        }
        SourceConfig::Synthetic(spec) => {
            let momenta = &config.two_point.momenta;
            let three_point = match &config.three_point {
                Some(three) => synthetic::three_point(
                    spec,
                    momenta,
                    &three.displacements,
                    &three.separations,
                    &three.insertions,
                ),
                None => ThreePointData::default(),
            };
            RawEnsemble {
                ncfg: spec.ncfg,
                seed: Some(spec.seed),
                two_point: synthetic::two_point(spec, momenta, nt),
                three_point,
            }
        }
    };
    info!(
        ncfg = ensemble.ncfg,
        two_point = ensemble.two_point.samples.len(),
        three_point = ensemble.three_point.samples.len(),
        "raw ensemble loaded"
    );
    Ok(ensemble)
}
