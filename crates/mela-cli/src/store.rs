//! JSON dataset tree: one directory per [`DatasetPath`], `bins.json` and
//! `mean.json` leaves, `provenance.json` at the root.

use std::fs;
use std::path::{Path, PathBuf};

use mela_core::errors::{ErrorInfo, MelaError};
use mela_core::keys::Channel;
use mela_core::path::DatasetPath;
use mela_core::provenance::RunProvenance;
use mela_corr::channel_bins;
use mela_jack::{estimate, Bins, JackknifeMean, JackknifeSet};
use num_complex::Complex64;
use serde::Serialize;

fn io_error(code: &str, path: &Path, err: impl ToString) -> MelaError {
    MelaError::Io(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Writer of one output tree.
#[derive(Debug)]
pub struct JsonStore {
    root: PathBuf,
    datasets: usize,
}

impl JsonStore {
    /// Creates the root directory if needed.
    pub fn create(root: &Path) -> Result<Self, MelaError> {
        fs::create_dir_all(root).map_err(|err| io_error("store-create", root, err))?;
        Ok(Self {
            root: root.to_path_buf(),
            datasets: 0,
        })
    }

    /// Root directory of the tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of datasets written so far.
    pub fn datasets(&self) -> usize {
        self.datasets
    }

    /// Writes `value` as `<path>/<name>.json`.
    pub fn write_value<T: Serialize>(
        &mut self,
        path: &DatasetPath,
        name: &str,
        value: &T,
    ) -> Result<(), MelaError> {
        let dir = self.root.join(path.to_path_buf());
        fs::create_dir_all(&dir).map_err(|err| io_error("store-create", &dir, err))?;
        let file = dir.join(format!("{name}.json"));
        let json = serde_json::to_string_pretty(value).map_err(|err| {
            MelaError::Serde(
                ErrorInfo::new("store-encode", err.to_string())
                    .with_context("dataset", path.to_string()),
            )
        })?;
        fs::write(&file, json).map_err(|err| io_error("store-write", &file, err))
    }

    /// Writes the bins and jackknife mean of one dataset.
    pub fn write_dataset(
        &mut self,
        path: &DatasetPath,
        bins: &Bins<f64>,
        mean: &JackknifeMean<f64>,
    ) -> Result<(), MelaError> {
        self.write_value(path, "bins", bins)?;
        self.write_value(path, "mean", mean)?;
        self.datasets += 1;
        Ok(())
    }

    /// Writes every key of a real-valued set.
    pub fn write_set<K: Ord + Clone>(
        &mut self,
        set: &JackknifeSet<K, f64>,
        path_of: impl Fn(&K) -> DatasetPath,
    ) -> Result<(), MelaError> {
        for (key, bins, mean) in set.iter() {
            self.write_dataset(&path_of(key), bins, mean)?;
        }
        Ok(())
    }

    /// Writes both channels of every key of a complex set.
    pub fn write_complex_set<K: Ord + Clone>(
        &mut self,
        set: &JackknifeSet<K, Complex64>,
        path_of: impl Fn(&K) -> DatasetPath,
    ) -> Result<(), MelaError> {
        for (key, bins, _) in set.iter() {
            for channel in Channel::ALL {
                let part = channel_bins(bins, channel);
                let mean = estimate(&part, part.nbins(), part.width())?;
                self.write_dataset(&path_of(key).channel(channel), &part, &mean)?;
            }
        }
        Ok(())
    }

    /// Writes `provenance.json` at the root.
    pub fn write_provenance(&mut self, provenance: &RunProvenance) -> Result<(), MelaError> {
        let file = self.root.join("provenance.json");
        let json = serde_json::to_string_pretty(provenance)
            .map_err(|err| MelaError::Serde(ErrorInfo::new("store-encode", err.to_string())))?;
        fs::write(&file, json).map_err(|err| io_error("store-write", &file, err))
    }
}
