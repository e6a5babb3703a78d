//! ASCII correlators listed in a JSON manifest.
//!
//! Each file holds `ncfg * extent` lines of `t re im`, configuration-major:
//! line `cfg * extent + t` carries time slice `t` of configuration `cfg`.

use std::fs;
use std::path::{Path, PathBuf};

use mela_core::errors::{ErrorInfo, MelaError};
use mela_core::keys::{Displacement, Insertion, Momentum, OperatorPair, ThreePointKey, TwoPointKey};
use mela_corr::{RawSample, ThreePointData, TwoPointData};
use num_complex::Complex64;
use serde::Deserialize;
use tracing::debug;

/// One two-point file.
#[derive(Debug, Clone, Deserialize)]
pub struct TwoPointEntry {
    /// Momentum.
    pub mom: Momentum,
    /// Source time slice.
    #[serde(default)]
    pub t0: u32,
    /// Source operator.
    pub src: String,
    /// Sink operator.
    pub snk: String,
    /// Operator row.
    #[serde(default = "default_row")]
    pub row: u32,
    /// Data file, relative to the manifest.
    pub file: PathBuf,
}

/// One three-point file; its extent is the separation.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreePointEntry {
    /// Momentum.
    pub mom: Momentum,
    /// Source-sink separation.
    pub tsep: u32,
    /// Source time slice.
    #[serde(default)]
    pub t0: u32,
    /// Displacement.
    #[serde(default = "local")]
    pub disp: Displacement,
    /// Source operator.
    pub src: String,
    /// Sink operator.
    pub snk: String,
    /// Operator row.
    #[serde(default = "default_row")]
    pub row: u32,
    /// Insertion current.
    pub insertion: Insertion,
    /// Data file, relative to the manifest.
    pub file: PathBuf,
}

fn default_row() -> u32 {
    1
}

fn local() -> Displacement {
    Displacement::ZERO
}

/// File list of an ensemble.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Number of gauge configurations in every file.
    pub ncfg: usize,
    /// Two-point files.
    #[serde(default)]
    pub two_point: Vec<TwoPointEntry>,
    /// Three-point files.
    #[serde(default)]
    pub three_point: Vec<ThreePointEntry>,
}

fn format_error(file: &Path, line: usize, message: impl Into<String>) -> MelaError {
    MelaError::InvalidInput(
        ErrorInfo::new("ascii-format", message)
            .with_context("file", file.display().to_string())
            .with_context("line", line.to_string()),
    )
}

/// Parses one correlator file.
pub fn parse_correlator(
    file: &Path,
    contents: &str,
    ncfg: usize,
    extent: usize,
) -> Result<RawSample, MelaError> {
    if extent == 0 {
        return Err(format_error(file, 0, "correlator extent must be positive"));
    }
    let mut data = Vec::with_capacity(ncfg * extent);
    let lines = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'));
    for (lineno, line) in lines {
        if data.len() == ncfg * extent {
            return Err(format_error(file, lineno + 1, "file holds more lines than expected"));
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [t, re, im] = fields.as_slice() else {
            return Err(format_error(file, lineno + 1, "expected `t re im`"));
        };
        let expected_t = data.len() % extent;
        let t: usize = t
            .parse()
            .map_err(|_| format_error(file, lineno + 1, "time slice is not an integer"))?;
        if t != expected_t {
            return Err(format_error(
                file,
                lineno + 1,
                format!("expected time slice {expected_t}, found {t}"),
            ));
        }
        let re: f64 = re
            .parse()
            .map_err(|_| format_error(file, lineno + 1, "real part is not a number"))?;
        let im: f64 = im
            .parse()
            .map_err(|_| format_error(file, lineno + 1, "imaginary part is not a number"))?;
        data.push(Complex64::new(re, im));
    }
    if data.len() != ncfg * extent {
        return Err(MelaError::InvalidInput(
            ErrorInfo::new("ascii-short", "file holds fewer lines than expected")
                .with_context("file", file.display().to_string())
                .with_context("expected", (ncfg * extent).to_string())
                .with_context("found", data.len().to_string()),
        ));
    }
    RawSample::new(ncfg, extent, data)
}

fn read_correlator(file: &Path, ncfg: usize, extent: usize) -> Result<RawSample, MelaError> {
    let contents = fs::read_to_string(file).map_err(|err| {
        MelaError::Io(
            ErrorInfo::new("ascii-read", err.to_string())
                .with_context("file", file.display().to_string()),
        )
    })?;
    parse_correlator(file, &contents, ncfg, extent)
}

/// Reads every file of the manifest at `path`.
pub fn load(path: &Path, nt: usize) -> Result<(usize, TwoPointData, ThreePointData), MelaError> {
    let contents = fs::read_to_string(path).map_err(|err| {
        MelaError::Io(
            ErrorInfo::new("manifest-read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    let manifest: Manifest = serde_json::from_str(&contents).map_err(|err| {
        MelaError::Serde(
            ErrorInfo::new("manifest-parse", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut two = TwoPointData::default();
    for entry in &manifest.two_point {
        let sample = read_correlator(&base.join(&entry.file), manifest.ncfg, nt)?;
        let key = TwoPointKey {
            mom: entry.mom,
            t0: entry.t0,
            ops: OperatorPair::new(entry.src.clone(), entry.snk.clone()),
            row: entry.row,
        };
        two.samples.insert(key, sample);
    }
    let mut three = ThreePointData::default();
    for entry in &manifest.three_point {
        let sample = read_correlator(&base.join(&entry.file), manifest.ncfg, entry.tsep as usize)?;
        let key = ThreePointKey {
            mom: entry.mom,
            tsep: entry.tsep,
            t0: entry.t0,
            disp: entry.disp,
            ops: OperatorPair::new(entry.src.clone(), entry.snk.clone()),
            row: entry.row,
            insertion: entry.insertion.clone(),
        };
        three.samples.insert(key, sample);
    }
    debug!(
        two_point = two.samples.len(),
        three_point = three.samples.len(),
        ncfg = manifest.ncfg,
        "ASCII manifest read"
    );
    Ok((manifest.ncfg, two, three))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_configuration_major_lines() {
        let text = "0 1.0 0.5\n1 2.0 -0.5\n\n0 3.0 0.0\n1 4.0 1.0\n";
        let sample = parse_correlator(Path::new("c2.dat"), text, 2, 2).unwrap();
        assert_eq!(sample.get(1, 0), Complex64::new(3.0, 0.0));
        assert_eq!(sample.get(0, 1), Complex64::new(2.0, -0.5));
    }

    #[test]
    fn short_file_names_the_file() {
        let err = parse_correlator(Path::new("short.dat"), "0 1 0\n", 2, 2).unwrap_err();
        assert!(matches!(err, MelaError::InvalidInput(_)));
        assert_eq!(err.info().context["file"], "short.dat");
    }

    #[test]
    fn out_of_order_time_slice_is_rejected() {
        let err = parse_correlator(Path::new("c.dat"), "1 1 0\n0 1 0\n", 1, 2).unwrap_err();
        assert_eq!(err.info().code, "ascii-format");
        assert_eq!(err.info().context["line"], "1");
    }
}
