#![deny(missing_docs)]
#![doc = "Correlator aggregation: operator/row/source-time averages, momentum/displacement symmetrization and effective energies of jackknife-sampled two- and three-point functions."]

pub mod channel;
pub mod effenergy;
pub mod plan;
pub mod raw;
pub mod sampling;
pub mod symmetrize;
pub mod threepoint;
pub mod twopoint;

pub use channel::{channel_bins, component};
pub use effenergy::{effective_energy_bins, EffectiveEnergy};
pub use plan::{AnalysisParams, AveragingPlan, Presence};
pub use raw::{RawSample, ThreePointData, TwoPointData};
pub use sampling::jackknife_all;
pub use symmetrize::{symmetrize, Partner, SymmetrizationRule, Term};
pub use threepoint::{average_three_point, symmetrize_three_point, ThreePointStatistics};
pub use twopoint::{average_two_point, symmetrize_two_point, TwoPointStatistics};
