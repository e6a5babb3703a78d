//! Validated analysis parameters and the momentum/displacement averaging plan.

use std::collections::BTreeSet;

use mela_core::errors::{ErrorInfo, MelaError};
use mela_core::keys::{Displacement, Momentum};
use serde::{Deserialize, Serialize};

fn default_binsize() -> usize {
    1
}

/// Parameters shared by every jackknife stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Number of consecutive configurations deleted per jackknife bin.
    #[serde(default = "default_binsize")]
    pub binsize: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            binsize: default_binsize(),
        }
    }
}

impl AnalysisParams {
    /// Creates parameters for the given block size.
    pub fn new(binsize: usize) -> Result<Self, MelaError> {
        let params = Self { binsize };
        params.validate()?;
        Ok(params)
    }

    /// Rejects a zero block size.
    pub fn validate(&self) -> Result<(), MelaError> {
        if self.binsize == 0 {
            return Err(MelaError::InvalidInput(
                ErrorInfo::new("binsize-zero", "binsize must be positive")
                    .with_context("field", "analysis.binsize"),
            ));
        }
        Ok(())
    }
}

/// Which members of a `{x, -x}` partner pair exist in the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Presence {
    /// Only the requested value.
    Positive,
    /// Only the negated value.
    Negative,
    /// Both values.
    Both,
    /// Neither value.
    Neither,
}

impl Presence {
    /// Classifies a partner pair from two availability flags.
    pub fn from_flags(positive: bool, negative: bool) -> Self {
        match (positive, negative) {
            (true, true) => Presence::Both,
            (true, false) => Presence::Positive,
            (false, true) => Presence::Negative,
            (false, false) => Presence::Neither,
        }
    }

    /// True unless neither partner exists.
    pub fn any(&self) -> bool {
        !matches!(self, Presence::Neither)
    }
}

/// Momenta and displacements to symmetrize, in ascending order.
///
/// Iteration order of every symmetrized output follows the order stored
/// here, so the constructor sorts and deduplicates its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AveragingPlan {
    momenta: Vec<Momentum>,
    displacements: Vec<Displacement>,
}

impl AveragingPlan {
    /// Builds a plan from the requested averaged momenta and displacements.
    ///
    /// An empty displacement list means "local only" and is replaced by `[0]`.
    pub fn new(
        momenta: impl IntoIterator<Item = Momentum>,
        displacements: impl IntoIterator<Item = Displacement>,
    ) -> Result<Self, MelaError> {
        let momenta: Vec<Momentum> = momenta
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if momenta.is_empty() {
            return Err(MelaError::invalid(
                "plan-empty",
                "the averaging plan needs at least one momentum",
            ));
        }
        let mut displacements: Vec<Displacement> = displacements
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if displacements.is_empty() {
            displacements.push(Displacement::ZERO);
        }
        Ok(Self {
            momenta,
            displacements,
        })
    }

    /// Averaged momenta, ascending.
    pub fn momenta(&self) -> &[Momentum] {
        &self.momenta
    }

    /// Requested displacements, ascending.
    pub fn displacements(&self) -> &[Displacement] {
        &self.displacements
    }
}
