//! Which fit feeds the Ioffe-time distribution of each label.

use std::collections::{BTreeMap, BTreeSet};

use mela_core::errors::{ErrorInfo, MelaError};
use serde::{Deserialize, Serialize};

/// Matrix-element source for one fit label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItdSelection {
    /// Optimal plateau window at a fixed separation.
    Plateau {
        /// Separation whose plateau is used.
        tsep: u32,
        /// Inclusive `[tstart, tstop]` used when no window met the criterion.
        #[serde(default)]
        fallback: Option<[usize; 2]>,
    },
    /// Slope of a summation fit.
    Summation {
        /// Low separation cutoff of the fit.
        tsep_low: u32,
    },
}

/// Labels of the fits turned into Ioffe-time distributions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItdSpec {
    /// Fit label to matrix-element source.
    #[serde(default)]
    pub optimal_fits: BTreeMap<String, ItdSelection>,
}

impl ItdSpec {
    /// Checks every label against the configured plateau and summation fits.
    pub fn validate(
        &self,
        plateau_labels: &BTreeSet<String>,
        summation_labels: &BTreeSet<String>,
    ) -> Result<(), MelaError> {
        for (label, selection) in &self.optimal_fits {
            let (known, kind) = match selection {
                ItdSelection::Plateau { .. } => (plateau_labels.contains(label), "plateau"),
                ItdSelection::Summation { .. } => {
                    (summation_labels.contains(label), "summation")
                }
            };
            if !known {
                return Err(MelaError::InvalidInput(
                    ErrorInfo::new("unknown-fit-label", "ITD label names no configured fit")
                        .with_context("field", "itd.optimal_fits")
                        .with_context("label", label.clone())
                        .with_context("kind", kind),
                ));
            }
            if let ItdSelection::Plateau {
                fallback: Some([tstart, tstop]),
                ..
            } = selection
            {
                if *tstop < *tstart + 2 {
                    return Err(MelaError::InvalidInput(
                        ErrorInfo::new(
                            "invalid-fallback",
                            "plateau fallback range needs tstop >= tstart + 2",
                        )
                        .with_context("label", label.clone()),
                    ));
                }
            }
        }
        Ok(())
    }
}
