#![deny(missing_docs)]
#![doc = "Jackknife fit engines: inverse-variance constant fits with chi-square window selection and weighted linear summation fits with error bands."]

pub mod constant;
pub mod energy;
pub mod linear;
pub mod plateau;
pub mod spec;
pub mod summation;

pub use constant::{fit_constant, ConstantFit};
pub use energy::{fit_energy_range, EnergyFit, EnergyFits};
pub use linear::{fit_linear, linear_model, LinearFit};
pub use plateau::{
    fit_plateau, fit_window, plateau_windows, OptimalWindow, PlateauFits, PlateauResult,
    PlateauWindow, WindowFit,
};
pub use spec::{BandSpec, EffectiveEnergySpec, FitType, PlateauFitSpec, SummationFitSpec};
pub use summation::{
    error_band, fit_summation, linspace, ErrorBand, SummationFits, SummationKey, SummationResult,
};
