#![deny(missing_docs)]
#![doc = "Reduced Ioffe-time distributions built from plateau or summation matrix elements and their zero-momentum and zero-displacement references."]

pub mod itd;
pub mod source;
pub mod spec;

pub use itd::{evaluate_itd, reduced_itd, ItdKey, ItdSet, ItdValues};
pub use source::{MatrixElements, PlateauSource, SummationSource};
pub use spec::{ItdSelection, ItdSpec};
