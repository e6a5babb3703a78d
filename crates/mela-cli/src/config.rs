//! Run configuration: one YAML document validated once before any stage runs.

use std::collections::BTreeSet;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use mela_core::errors::{ErrorInfo, MelaError};
use mela_core::keys::{Displacement, Insertion, Momentum};
use mela_corr::{AnalysisParams, AveragingPlan};
use mela_fit::{EffectiveEnergySpec, PlateauFitSpec, SummationFitSpec};
use mela_itd::{ItdSelection, ItdSpec};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

fn default_true() -> bool {
    true
}

fn default_mass() -> f64 {
    0.5
}

fn default_extent() -> usize {
    16
}

fn default_noise() -> f64 {
    0.005
}

fn invalid_field(field: &str, message: &str) -> MelaError {
    MelaError::InvalidInput(ErrorInfo::new("invalid-config", message).with_context("field", field))
}

/// Where raw correlators come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// ASCII files listed in a JSON manifest; relative paths resolve against
    /// the configuration file.
    Ascii {
        /// Manifest path.
        manifest: PathBuf,
    },
    /// Deterministic synthetic ensemble.
    Synthetic(SyntheticSpec),
}

/// Parameters of the synthetic ensemble generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    /// Master seed.
    pub seed: u64,
    /// Number of configurations.
    pub ncfg: usize,
    /// Rest mass in lattice units.
    #[serde(default = "default_mass")]
    pub mass: f64,
    /// Spatial extent entering `2 pi p / L`.
    #[serde(default = "default_extent")]
    pub spatial_extent: usize,
    /// Relative Gaussian noise per configuration and time slice.
    #[serde(default = "default_noise")]
    pub noise: f64,
    /// Generate the `-p` and `-z` partners as well.
    #[serde(default = "default_true")]
    pub both_signs: bool,
}

/// Two-point settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoPointSpec {
    /// Temporal extent.
    pub nt: usize,
    /// Averaged momenta to symmetrize.
    pub momenta: Vec<Momentum>,
}

/// Three-point settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreePointSpec {
    /// Source-sink separations, strictly ascending.
    pub separations: Vec<u32>,
    /// Averaged displacements to symmetrize; empty means local only.
    #[serde(default)]
    pub displacements: Vec<Displacement>,
    /// Insertion currents.
    pub insertions: Vec<Insertion>,
}

/// Which ratio variants are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioSpec {
    /// Persist the plain ratio.
    #[serde(default = "default_true")]
    pub write_plain: bool,
    /// Persist summed and reduced-summed ratios with their separation series.
    #[serde(default = "default_true")]
    pub write_sums: bool,
}

impl Default for RatioSpec {
    fn default() -> Self {
        Self {
            write_plain: true,
            write_sums: true,
        }
    }
}

/// Complete description of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Jackknife parameters.
    #[serde(default)]
    pub analysis: AnalysisParams,
    /// Raw data source.
    pub source: SourceConfig,
    /// Two-point settings.
    pub two_point: TwoPointSpec,
    /// Three-point settings; required by the ratio stage and beyond.
    #[serde(default)]
    pub three_point: Option<ThreePointSpec>,
    /// Ratio persistence.
    #[serde(default)]
    pub ratio: RatioSpec,
    /// Effective-energy fit ranges.
    #[serde(default)]
    pub effective_energy: EffectiveEnergySpec,
    /// Plateau fit sequences.
    #[serde(default)]
    pub plateau_fits: Vec<PlateauFitSpec>,
    /// Summation fit sequences.
    #[serde(default)]
    pub summation_fits: Vec<SummationFitSpec>,
    /// Ioffe-time distributions.
    #[serde(default)]
    pub itd: ItdSpec,
}

impl RunConfig {
    /// Reads, resolves and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let contents = fs::read_to_string(path).map_err(|err| {
            MelaError::Io(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let mut config: RunConfig = serde_yaml::from_str(&contents).map_err(|err| {
            MelaError::Serde(
                ErrorInfo::new("config-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        if let SourceConfig::Ascii { manifest } = &mut config.source {
            if manifest.is_relative() {
                if let Some(dir) = path.parent() {
                    *manifest = dir.join(&*manifest);
                }
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Structural checks performed once, before any data is read.
    pub fn validate(&self) -> Result<(), MelaError> {
        self.analysis.validate()?;
        if self.two_point.nt < 2 {
            return Err(invalid_field("two_point.nt", "nt must be at least 2"));
        }
        if self.two_point.momenta.is_empty() {
            return Err(invalid_field(
                "two_point.momenta",
                "at least one momentum is required",
            ));
        }
        if let SourceConfig::Synthetic(spec) = &self.source {
            if spec.ncfg < 2 * self.analysis.binsize {
                return Err(invalid_field(
                    "source.ncfg",
                    "synthetic ensembles need at least two jackknife bins",
                ));
            }
            let noise_ok = spec.noise.is_finite() && spec.noise >= 0.0;
            let mass_ok = spec.mass.is_finite() && spec.mass > 0.0;
            if !noise_ok || !mass_ok || spec.spatial_extent == 0 {
                return Err(invalid_field(
                    "source",
                    "synthetic mass and extent must be positive and noise non-negative",
                ));
            }
        }
        if let Some(three) = &self.three_point {
            if three.separations.is_empty()
                || three.separations.windows(2).any(|w| w[0] >= w[1])
            {
                return Err(invalid_field(
                    "three_point.separations",
                    "separations must be non-empty, sorted and unique",
                ));
            }
            if three.insertions.is_empty() {
                return Err(invalid_field(
                    "three_point.insertions",
                    "at least one insertion is required",
                ));
            }
            if let Some(&tsep) = three.separations.last() {
                if tsep as usize >= self.two_point.nt {
                    return Err(invalid_field(
                        "three_point.separations",
                        "separations must lie inside the two-point time extent",
                    ));
                }
            }
        } else if !self.plateau_fits.is_empty() || !self.summation_fits.is_empty() {
            return Err(invalid_field(
                "three_point",
                "ratio fits need a three_point section",
            ));
        }

        self.effective_energy.validate()?;
        for &[_, tstop] in &self.effective_energy.fits {
            if tstop >= self.two_point.nt {
                return Err(invalid_field(
                    "effective_energy.fits",
                    "fit range exceeds the two-point time extent",
                ));
            }
        }

        let mut plateau_labels = BTreeSet::new();
        for spec in &self.plateau_fits {
            spec.validate()?;
            if !plateau_labels.insert(spec.label.clone()) {
                return Err(invalid_field("plateau_fits.label", "duplicate fit label"));
            }
        }
        let mut summation_labels = BTreeSet::new();
        for spec in &self.summation_fits {
            spec.validate()?;
            if !summation_labels.insert(spec.label.clone()) {
                return Err(invalid_field("summation_fits.label", "duplicate fit label"));
            }
        }
        self.itd.validate(&plateau_labels, &summation_labels)?;
        let separations = self
            .three_point
            .as_ref()
            .map(|three| three.separations.as_slice())
            .unwrap_or_default();
        for (label, selection) in &self.itd.optimal_fits {
            let known = match selection {
                ItdSelection::Plateau { tsep, .. } => separations.contains(tsep),
                ItdSelection::Summation { tsep_low } => self
                    .summation_fits
                    .iter()
                    .any(|spec| spec.label == *label && spec.tsep_low.contains(tsep_low)),
            };
            if !known {
                return Err(MelaError::InvalidInput(
                    ErrorInfo::new(
                        "invalid-config",
                        "ITD selection names a separation that is not analysed",
                    )
                    .with_context("field", "itd.optimal_fits")
                    .with_context("label", label.clone()),
                ));
            }
        }
        Ok(())
    }

    /// The averaging plan implied by the requested momenta and displacements.
    pub fn plan(&self) -> Result<AveragingPlan, MelaError> {
        let displacements = self
            .three_point
            .as_ref()
            .map(|three| three.displacements.clone())
            .unwrap_or_default();
        AveragingPlan::new(self.two_point.momenta.iter().copied(), displacements)
    }

    /// SHA-256 of the canonical JSON of the configuration.
    pub fn hash(&self) -> Result<String, MelaError> {
        let bytes = serde_json::to_vec(self)
            .map_err(|err| MelaError::Serde(ErrorInfo::new("config-hash", err.to_string())))?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
analysis:
  binsize: 2
source:
  kind: synthetic
  seed: 11
  ncfg: 20
two_point:
  nt: 12
  momenta: [[0, 0, 0], [0, 0, 1]]
three_point:
  separations: [4, 6]
  displacements: [0, 2]
  insertions: [gt]
plateau_fits:
  - label: plat
summation_fits:
  - label: summ
    tsep_low: [4]
itd:
  optimal_fits:
    plat:
      kind: plateau
      tsep: 6
"#;

    fn base() -> RunConfig {
        serde_yaml::from_str(BASE).unwrap()
    }

    #[test]
    fn defaults_and_validation() {
        let config = base();
        config.validate().unwrap();
        assert!(config.ratio.write_plain);
        let SourceConfig::Synthetic(spec) = &config.source else {
            panic!("expected synthetic source");
        };
        assert_eq!(spec.spatial_extent, 16);
        assert!(spec.both_signs);
        let plan = config.plan().unwrap();
        assert_eq!(plan.displacements(), &[Displacement(0), Displacement(2)]);
    }

    #[test]
    fn unsorted_separations_are_rejected() {
        let mut config = base();
        config.three_point.as_mut().unwrap().separations = vec![6, 4];
        let err = config.validate().unwrap_err();
        assert_eq!(err.info().context["field"], "three_point.separations");
    }

    #[test]
    fn itd_label_must_name_a_fit() {
        let mut config = base();
        config.plateau_fits.clear();
        let err = config.validate().unwrap_err();
        assert_eq!(err.info().code, "unknown-fit-label");
    }

    #[test]
    fn hash_tracks_content() {
        let config = base();
        let mut other = base();
        other.analysis.binsize = 1;
        assert_eq!(config.hash().unwrap().len(), 64);
        assert_eq!(config.hash().unwrap(), base().hash().unwrap());
        assert_ne!(config.hash().unwrap(), other.hash().unwrap());
    }
}
