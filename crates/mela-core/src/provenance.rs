//! Provenance and schema descriptors written next to analysis outputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Semantic version describing the layout of persisted datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version incremented for breaking layout changes.
    pub major: u32,
    /// Minor version incremented for additive changes.
    pub minor: u32,
    /// Patch version incremented for fixes.
    pub patch: u32,
}

impl SchemaVersion {
    /// Creates a new schema version descriptor.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

/// Provenance information attached to every output tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// Layout version of the dataset tree.
    pub schema_version: SchemaVersion,
    /// SHA-256 of the canonical JSON of the validated run configuration.
    pub config_hash: String,
    /// Pipeline stage the run stopped after.
    pub stage: String,
    /// Number of gauge configurations read.
    pub ncfg: usize,
    /// Jackknife block size.
    pub binsize: usize,
    /// Number of jackknife bins.
    pub nbins: usize,
    /// Seed of the synthetic ensemble, when one was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// ISO-8601 timestamp recording when the outputs were generated.
    pub created_at: String,
    /// Version map for the crates involved in the run.
    pub tool_versions: BTreeMap<String, String>,
}
