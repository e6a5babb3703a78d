//! Fit configuration as read from the run configuration.

use mela_core::errors::{ErrorInfo, MelaError};
use serde::{Deserialize, Serialize};

/// Fit model named in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitType {
    /// `y = M`, used for plateau fits.
    Constant,
    /// `y = M * x + b`, used for summation fits.
    Linear,
}

fn default_constant() -> FitType {
    FitType::Constant
}

fn default_linear() -> FitType {
    FitType::Linear
}

fn default_chi_criterion() -> f64 {
    1.0
}

fn default_write() -> bool {
    true
}

fn default_band_points() -> usize {
    100
}

fn invalid_field(field: &str, label: &str, message: &str) -> MelaError {
    MelaError::InvalidInput(
        ErrorInfo::new("invalid-fit-config", message)
            .with_context("field", field)
            .with_context("label", label),
    )
}

/// Plateau fits of the plain ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateauFitSpec {
    /// Name of this fit sequence.
    pub label: String,
    /// Must be [`FitType::Constant`].
    #[serde(default = "default_constant", rename = "type")]
    pub fit_type: FitType,
    /// Acceptance threshold on the jackknife mean of the reduced chi-square.
    #[serde(default = "default_chi_criterion")]
    pub chi_criterion: f64,
    /// Whether the fit results are persisted.
    #[serde(default = "default_write")]
    pub write: bool,
}

impl PlateauFitSpec {
    /// Checks the fit type and the acceptance threshold.
    pub fn validate(&self) -> Result<(), MelaError> {
        if self.label.is_empty() {
            return Err(invalid_field("label", &self.label, "fit label must not be empty"));
        }
        if self.fit_type != FitType::Constant {
            return Err(invalid_field(
                "type",
                &self.label,
                "plateau fits support only the Constant type",
            ));
        }
        if self.chi_criterion.is_nan() || self.chi_criterion <= 0.0 {
            return Err(invalid_field(
                "chi_criterion",
                &self.label,
                "chi-square criterion must be positive",
            ));
        }
        Ok(())
    }
}

/// Error-band evaluation of a summation fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandSpec {
    /// Whether bands are evaluated at all.
    #[serde(default)]
    pub evaluate: bool,
    /// Number of equally spaced points.
    #[serde(default = "default_band_points")]
    pub npoints: usize,
}

impl Default for BandSpec {
    fn default() -> Self {
        Self {
            evaluate: false,
            npoints: default_band_points(),
        }
    }
}

/// Linear fits of the summed ratio against the separation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummationFitSpec {
    /// Name of this fit sequence.
    pub label: String,
    /// Must be [`FitType::Linear`].
    #[serde(default = "default_linear", rename = "type")]
    pub fit_type: FitType,
    /// Low cutoffs; each fit uses every separation `>= tsep_low`.
    pub tsep_low: Vec<u32>,
    /// Error-band settings.
    #[serde(default)]
    pub bands: BandSpec,
    /// Whether the fit results are persisted.
    #[serde(default = "default_write")]
    pub write: bool,
}

impl SummationFitSpec {
    /// Checks the fit type, the cutoffs and the band resolution.
    pub fn validate(&self) -> Result<(), MelaError> {
        if self.label.is_empty() {
            return Err(invalid_field("label", &self.label, "fit label must not be empty"));
        }
        if self.fit_type != FitType::Linear {
            return Err(invalid_field(
                "type",
                &self.label,
                "summation fits support only the Linear type",
            ));
        }
        if self.tsep_low.is_empty() {
            return Err(invalid_field(
                "tsep_low",
                &self.label,
                "at least one low separation cutoff is required",
            ));
        }
        if self.bands.evaluate && self.bands.npoints < 2 {
            return Err(invalid_field(
                "bands.npoints",
                &self.label,
                "error bands need at least two points",
            ));
        }
        Ok(())
    }
}

/// Constant-fit ranges of the effective energy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectiveEnergySpec {
    /// Inclusive `[tstart, tstop]` ranges.
    #[serde(default)]
    pub fits: Vec<[usize; 2]>,
}

impl EffectiveEnergySpec {
    /// Checks that every range is ordered and holds at least three points.
    pub fn validate(&self) -> Result<(), MelaError> {
        for &[tstart, tstop] in &self.fits {
            if tstop < tstart + 2 {
                return Err(MelaError::InvalidInput(
                    ErrorInfo::new(
                        "invalid-fit-config",
                        "effective energy fit ranges need tstop >= tstart + 2",
                    )
                    .with_context("field", "effective_energy.fits")
                    .with_context("range", format!("{tstart}-{tstop}")),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let spec: PlateauFitSpec = serde_json::from_str(r#"{"label": "plat"}"#).unwrap();
        assert_eq!(spec.fit_type, FitType::Constant);
        assert_eq!(spec.chi_criterion, 1.0);
        assert!(spec.write);
        spec.validate().unwrap();
    }

    #[test]
    fn wrong_type_is_rejected() {
        let spec: SummationFitSpec =
            serde_json::from_str(r#"{"label": "summ", "type": "Constant", "tsep_low": [4]}"#)
                .unwrap();
        let err = spec.validate().unwrap_err();
        assert_eq!(err.info().context["field"], "type");
    }

    #[test]
    fn band_resolution_is_checked() {
        let spec = SummationFitSpec {
            label: "summ".into(),
            fit_type: FitType::Linear,
            tsep_low: vec![4],
            bands: BandSpec {
                evaluate: true,
                npoints: 1,
            },
            write: true,
        };
        assert!(spec.validate().is_err());
    }
}
