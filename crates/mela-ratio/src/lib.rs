#![deny(missing_docs)]
#![doc = "Ratios of three- to two-point jackknife bins: plain per insertion time, summed over insertion times and reduced-summed between adjacent separations."]

pub mod ratio;
pub mod set;

pub use ratio::{plain_ratio, reduced_summed_ratio, summed_ratio};
pub use set::{RatioChannelKey, Ratios, SeparationSeries};
