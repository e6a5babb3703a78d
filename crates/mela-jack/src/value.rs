//! Element types the resampling engine operates on.

use std::fmt::Debug;
use std::ops::{Add, Sub};

use num_complex::Complex64;

/// Numeric element of a correlator array.
///
/// Implemented for `f64` and `Complex64`. Complex data keeps both components
/// through every operation; the error of a complex estimate is reported per
/// component (`re` error in the real part, `im` error in the imaginary part).
pub trait Sample:
    Copy + Debug + PartialEq + Send + Sync + Add<Output = Self> + Sub<Output = Self>
{
    /// Additive identity.
    fn zero() -> Self;

    /// Multiplies every component by a real factor.
    fn scale(self, factor: f64) -> Self;

    /// Squares every component independently.
    fn component_sq(self) -> Self;

    /// Takes the square root of every component independently.
    fn component_sqrt(self) -> Self;

    /// False when any component is NaN or infinite.
    fn is_defined(&self) -> bool;
}

impl Sample for f64 {
    fn zero() -> Self {
        0.0
    }

    fn scale(self, factor: f64) -> Self {
        self * factor
    }

    fn component_sq(self) -> Self {
        self * self
    }

    fn component_sqrt(self) -> Self {
        self.sqrt()
    }

    fn is_defined(&self) -> bool {
        self.is_finite()
    }
}

impl Sample for Complex64 {
    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }

    fn scale(self, factor: f64) -> Self {
        self * factor
    }

    fn component_sq(self) -> Self {
        Complex64::new(self.re * self.re, self.im * self.im)
    }

    fn component_sqrt(self) -> Self {
        Complex64::new(self.re.sqrt(), self.im.sqrt())
    }

    fn is_defined(&self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}
