//! Composite keys identifying correlator data at every pipeline stage.
//!
//! All keys derive `Ord` so the flat `BTreeMap`s used by the stages iterate
//! in a defined order: momenta lexicographically by component, displacements
//! and separations ascending.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, MelaError};

/// Lattice momentum vector in units of `2*pi/L`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Momentum(pub [i32; 3]);

impl Momentum {
    /// The zero momentum vector.
    pub const ZERO: Momentum = Momentum([0, 0, 0]);

    /// Creates a momentum from its three components.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self([x, y, z])
    }

    /// Returns the parity partner `-p`.
    pub fn negated(&self) -> Self {
        Self(self.0.map(|c| -c))
    }

    /// Returns true for the zero vector.
    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0]
    }

    /// Comma separated tag, e.g. `1,0,-1`.
    pub fn tag(&self) -> String {
        self.0
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Dataset path segment with explicit signs, e.g. `mom_+1_0_-1`.
    pub fn path_tag(&self) -> String {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|&c| if c > 0 { format!("+{c}") } else { c.to_string() })
            .collect();
        format!("mom_{}", parts.join("_"))
    }
}

impl fmt::Display for Momentum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Momentum {
    type Err = MelaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(MelaError::InvalidInput(
                ErrorInfo::new("momentum-parse", "momentum needs three components")
                    .with_context("value", s),
            ));
        }
        let mut out = [0i32; 3];
        for (slot, part) in out.iter_mut().zip(parts) {
            *slot = part.parse().map_err(|_| {
                MelaError::InvalidInput(
                    ErrorInfo::new("momentum-parse", "momentum component is not an integer")
                        .with_context("value", s),
                )
            })?;
        }
        Ok(Self(out))
    }
}

/// Signed displacement `z3` of the non-local insertion, in lattice units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Displacement(pub i32);

impl Displacement {
    /// The local (zero) displacement.
    pub const ZERO: Displacement = Displacement(0);

    /// Returns the partner `-z`.
    pub fn negated(&self) -> Self {
        Self(-self.0)
    }

    /// Returns true for the local insertion.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Dataset path segment, e.g. `disp_z+2`, `disp_z-1`, `disp_0`.
    pub fn path_tag(&self) -> String {
        match self.0 {
            0 => "disp_0".to_string(),
            z if z > 0 => format!("disp_z+{z}"),
            z => format!("disp_z{z}"),
        }
    }
}

impl fmt::Display for Displacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source and sink interpolating operators of a correlator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperatorPair {
    /// Source operator name.
    pub src: String,
    /// Sink operator name.
    pub snk: String,
}

impl OperatorPair {
    /// Creates an operator pair.
    pub fn new(src: impl Into<String>, snk: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            snk: snk.into(),
        }
    }

    /// Dataset path segment, e.g. `src_snk_N1_N1`.
    pub fn path_tag(&self) -> String {
        format!("src_snk_{}_{}", self.src, self.snk)
    }
}

/// Insertion current, named by its gamma structure (`gt`, `gxg5`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Insertion(pub String);

impl Insertion {
    /// Creates an insertion from its gamma-structure name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Dataset path segment, e.g. `ins_gt`.
    pub fn path_tag(&self) -> String {
        format!("ins_{}", self.0)
    }
}

impl fmt::Display for Insertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Real or imaginary part of a complex correlator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Real part.
    Re,
    /// Imaginary part.
    Im,
}

impl Channel {
    /// Both channels in output order.
    pub const ALL: [Channel; 2] = [Channel::Re, Channel::Im];

    /// Short name used in dataset paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Re => "Re",
            Channel::Im => "Im",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one raw two-point measurement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TwoPointKey {
    /// Sink momentum.
    pub mom: Momentum,
    /// Source time slice.
    pub t0: u32,
    /// Interpolating operator pair.
    pub ops: OperatorPair,
    /// Row of the interpolating operators.
    pub row: u32,
}

/// Identifies one raw three-point measurement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThreePointKey {
    /// Sink momentum.
    pub mom: Momentum,
    /// Source-sink separation.
    pub tsep: u32,
    /// Source time slice.
    pub t0: u32,
    /// Displacement of the insertion.
    pub disp: Displacement,
    /// Interpolating operator pair.
    pub ops: OperatorPair,
    /// Row of the interpolating operators.
    pub row: u32,
    /// Insertion current.
    pub insertion: Insertion,
}

impl ThreePointKey {
    /// Drops the nuisance indices (source time, operators, row).
    pub fn ratio_key(&self) -> RatioKey {
        RatioKey {
            mom: self.mom,
            disp: self.disp,
            insertion: self.insertion.clone(),
            tsep: self.tsep,
        }
    }
}

/// Key of averaged three-point data, ratios and plateau fits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RatioKey {
    /// Momentum (raw or averaged, depending on the stage).
    pub mom: Momentum,
    /// Displacement.
    pub disp: Displacement,
    /// Insertion current.
    pub insertion: Insertion,
    /// Source-sink separation.
    pub tsep: u32,
}

impl RatioKey {
    /// Drops the separation, leaving the key of a summation series.
    pub fn series_key(&self) -> SeriesKey {
        SeriesKey {
            mom: self.mom,
            disp: self.disp,
            insertion: self.insertion.clone(),
        }
    }
}

impl fmt::Display for RatioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mom={} disp={} ins={} tsep={}",
            self.mom, self.disp, self.insertion, self.tsep
        )
    }
}

/// Key of data spanning all separations: summation fits and ITDs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    /// Averaged momentum.
    pub mom: Momentum,
    /// Displacement.
    pub disp: Displacement,
    /// Insertion current.
    pub insertion: Insertion,
}

impl SeriesKey {
    /// Re-attaches a separation.
    pub fn with_tsep(&self, tsep: u32) -> RatioKey {
        RatioKey {
            mom: self.mom,
            disp: self.disp,
            insertion: self.insertion.clone(),
            tsep,
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mom={} disp={} ins={}",
            self.mom, self.disp, self.insertion
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn momentum_tags() {
        let p = Momentum::new(1, 0, -2);
        assert_eq!(p.tag(), "1,0,-2");
        assert_eq!(p.path_tag(), "mom_+1_0_-2");
        assert_eq!(p.negated(), Momentum::new(-1, 0, 2));
        assert_eq!("1, 0,-2".parse::<Momentum>().unwrap(), p);
        assert!("1,0".parse::<Momentum>().is_err());
    }

    #[test]
    fn displacement_tags() {
        assert_eq!(Displacement(0).path_tag(), "disp_0");
        assert_eq!(Displacement(3).path_tag(), "disp_z+3");
        assert_eq!(Displacement(-3).path_tag(), "disp_z-3");
    }

    #[test]
    fn ratio_keys_order_by_separation_last() {
        let a = RatioKey {
            mom: Momentum::ZERO,
            disp: Displacement(1),
            insertion: Insertion::new("gt"),
            tsep: 10,
        };
        let b = RatioKey { tsep: 4, ..a.clone() };
        assert!(b < a);
        assert_eq!(a.series_key(), b.series_key());
    }
}
