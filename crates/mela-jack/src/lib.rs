#![deny(missing_docs)]
#![doc = "Deletion-d jackknife resampling for lattice correlators: bin counts, leave-one-block-out bins and bias-corrected mean/error estimates over real or complex arrays."]

pub mod bins;
pub mod checked;
pub mod jackknife;
pub mod set;
pub mod value;

pub use bins::Bins;
pub use checked::{ln_ratio, ratio};
pub use jackknife::{
    estimate, estimate_scalar, number_of_bins, sample, sample_columns, JackknifeMean,
};
pub use set::JackknifeSet;
pub use value::Sample;
