//! Structured dataset paths for hierarchical persistence.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::keys::{Channel, Displacement, Insertion, Momentum};

/// Ordered list of path segments addressing one persisted dataset.
///
/// Segments never contain `/`; the store maps them onto directories.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct DatasetPath {
    segments: Vec<String>,
}

impl DatasetPath {
    /// Starts a path at the given root segment (`ratio`, `plateau`, ...).
    pub fn root(segment: impl Into<String>) -> Self {
        Self {
            segments: vec![segment.into()],
        }
    }

    /// Appends a raw segment.
    pub fn push(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into().replace('/', "_"));
        self
    }

    /// Appends a momentum tag.
    pub fn momentum(self, mom: &Momentum) -> Self {
        self.push(mom.path_tag())
    }

    /// Appends a displacement tag.
    pub fn displacement(self, disp: &Displacement) -> Self {
        self.push(disp.path_tag())
    }

    /// Appends an insertion tag.
    pub fn insertion(self, insertion: &Insertion) -> Self {
        self.push(insertion.path_tag())
    }

    /// Appends a separation tag, e.g. `tsnk_8`.
    pub fn separation(self, tsep: u32) -> Self {
        self.push(format!("tsnk_{tsep}"))
    }

    /// Appends a source-time tag, e.g. `t0_4`.
    pub fn source_time(self, t0: u32) -> Self {
        self.push(format!("t0_{t0}"))
    }

    /// Appends a row tag, e.g. `row_1`.
    pub fn row(self, row: u32) -> Self {
        self.push(format!("row_{row}"))
    }

    /// Appends the real/imaginary channel.
    pub fn channel(self, channel: Channel) -> Self {
        self.push(channel.as_str())
    }

    /// Returns the segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Maps the path onto a relative filesystem path.
    pub fn to_path_buf(&self) -> PathBuf {
        self.segments.iter().collect()
    }
}

impl fmt::Display for DatasetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_ratio_layout() {
        let path = DatasetPath::root("ratio")
            .push("plain")
            .momentum(&Momentum::new(0, 0, 2))
            .separation(8)
            .displacement(&Displacement(-1))
            .insertion(&Insertion::new("gt"))
            .channel(Channel::Im);
        assert_eq!(
            path.to_string(),
            "ratio/plain/mom_0_0_+2/tsnk_8/disp_z-1/ins_gt/Im"
        );
        assert_eq!(path.segments().len(), 7);
    }
}
