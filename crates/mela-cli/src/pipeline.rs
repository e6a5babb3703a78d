//! Runs the analysis up to a requested stage and persists every product.

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::Utc;
use mela_core::errors::{ErrorInfo, MelaError};
use mela_core::keys::{Channel, RatioKey, SeriesKey, ThreePointKey, TwoPointKey};
use mela_core::path::DatasetPath;
use mela_core::provenance::{RunProvenance, SchemaVersion};
use mela_corr::{EffectiveEnergy, ThreePointStatistics, TwoPointStatistics};
use mela_fit::{EnergyFits, PlateauFits, SummationFits};
use mela_itd::ItdSet;
use mela_ratio::Ratios;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::source::{self, RawEnsemble};
use crate::store::JsonStore;

/// Last stage a run executes; every earlier stage runs too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Two-point averaging and symmetrization.
    TwoPoint,
    /// Effective energies and their fits.
    EffectiveEnergy,
    /// Three-point statistics and ratios.
    Ratio,
    /// Plateau and summation fits.
    Fit,
    /// Ioffe-time distributions.
    Itd,
}

impl Stage {
    /// Name recorded in the provenance.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::TwoPoint => "two-point",
            Stage::EffectiveEnergy => "effective-energy",
            Stage::Ratio => "ratio",
            Stage::Fit => "fit",
            Stage::Itd => "itd",
        }
    }
}

/// Products of one run.
#[derive(Debug, Clone)]
pub struct Products {
    /// Two-point statistics.
    pub two_point: TwoPointStatistics,
    /// Effective energies.
    pub effective_energy: Option<EffectiveEnergy>,
    /// Effective-energy fits.
    pub energy_fits: Option<EnergyFits>,
    /// Three-point statistics.
    pub three_point: Option<ThreePointStatistics>,
    /// Ratios.
    pub ratios: Option<Ratios>,
    /// Plateau fit sequences in configuration order.
    pub plateau: Vec<PlateauFits>,
    /// Summation fit sequences in configuration order.
    pub summation: Vec<SummationFits>,
    /// Ioffe-time distributions.
    pub itd: Option<ItdSet>,
}

fn missing_three_point(stage: Stage) -> MelaError {
    MelaError::InvalidInput(
        ErrorInfo::new("three-point-missing", "stage needs a three_point section")
            .with_context("stage", stage.as_str()),
    )
}

/// Computes every stage up to and including `stage`.
pub fn compute(
    config: &RunConfig,
    ensemble: &RawEnsemble,
    stage: Stage,
) -> Result<Products, MelaError> {
    let plan = config.plan()?;
    let two_point = TwoPointStatistics::compute(&ensemble.two_point, &plan, &config.analysis)?;
    let mut products = Products {
        two_point,
        effective_energy: None,
        energy_fits: None,
        three_point: None,
        ratios: None,
        plateau: Vec::new(),
        summation: Vec::new(),
        itd: None,
    };
    if stage >= Stage::EffectiveEnergy {
        let energy = EffectiveEnergy::compute(&products.two_point)?;
        products.energy_fits = Some(EnergyFits::run(&config.effective_energy, &energy)?);
        products.effective_energy = Some(energy);
    }
    if stage >= Stage::Ratio {
        if config.three_point.is_none() {
            return Err(missing_three_point(stage));
        }
        let three =
            ThreePointStatistics::compute(&ensemble.three_point, &plan, &config.analysis)?;
        products.ratios = Some(Ratios::construct(&products.two_point, &three)?);
        products.three_point = Some(three);
    }
    if stage >= Stage::Fit {
        let ratios = products.ratios.as_ref().ok_or_else(|| missing_three_point(stage))?;
        for spec in &config.plateau_fits {
            products.plateau.push(PlateauFits::run(spec, ratios)?);
        }
        for spec in &config.summation_fits {
            products.summation.push(SummationFits::run(spec, ratios)?);
        }
    }
    if stage >= Stage::Itd {
        let ratios = products.ratios.as_ref().ok_or_else(|| missing_three_point(stage))?;
        products.itd = Some(ItdSet::evaluate(
            &config.itd,
            ratios,
            &products.plateau,
            &products.summation,
        )?);
    }
    Ok(products)
}

fn two_point_path(root: &str, level: &str, key: &TwoPointKey) -> DatasetPath {
    DatasetPath::root(root)
        .push(level)
        .momentum(&key.mom)
        .source_time(key.t0)
        .push(key.ops.path_tag())
        .row(key.row)
}

fn three_point_path(key: &ThreePointKey) -> DatasetPath {
    ratio_path(DatasetPath::root("three_point").push("plain"), &key.ratio_key())
        .source_time(key.t0)
        .push(key.ops.path_tag())
        .row(key.row)
}

fn ratio_path(base: DatasetPath, key: &RatioKey) -> DatasetPath {
    base.momentum(&key.mom)
        .separation(key.tsep)
        .displacement(&key.disp)
        .insertion(&key.insertion)
}

fn series_path(base: DatasetPath, key: &SeriesKey) -> DatasetPath {
    base.momentum(&key.mom)
        .displacement(&key.disp)
        .insertion(&key.insertion)
}

#[derive(Debug, Serialize)]
struct FailureRecord<'a> {
    key: String,
    error: &'a MelaError,
}

fn write_failures<'a, K: Display>(
    store: &mut JsonStore,
    path: &DatasetPath,
    failures: impl Iterator<Item = (K, &'a MelaError)>,
) -> Result<(), MelaError> {
    let records: Vec<FailureRecord<'a>> = failures
        .map(|(key, error)| FailureRecord {
            key: key.to_string(),
            error,
        })
        .collect();
    if records.is_empty() {
        return Ok(());
    }
    warn!(dataset = %path, failures = records.len(), "fits failed for some keys");
    store.write_value(path, "failures", &records)
}

struct ChannelKey<'a, K>(&'a K, Channel);

impl<K: Display> Display for ChannelKey<'_, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.0, self.1)
    }
}

/// Persists every product of `products` under the store root.
pub fn write(
    config: &RunConfig,
    products: &Products,
    store: &mut JsonStore,
) -> Result<(), MelaError> {
    let two = &products.two_point;
    store.write_complex_set(&two.plain, |k| two_point_path("two_point", "plain", k))?;
    store.write_complex_set(&two.averaged, |m| {
        DatasetPath::root("two_point").push("averaged").momentum(m)
    })?;
    store.write_complex_set(&two.symmetrized, |m| {
        DatasetPath::root("two_point").push("symmetrized").momentum(m)
    })?;

    if let Some(energy) = &products.effective_energy {
        store.write_set(&energy.plain, |k| {
            two_point_path("effective_energy", "plain", k)
        })?;
        store.write_set(&energy.averaged, |m| {
            DatasetPath::root("effective_energy").push("averaged").momentum(m)
        })?;
        store.write_set(&energy.symmetrized, |m| {
            DatasetPath::root("effective_energy").push("symmetrized").momentum(m)
        })?;
    }
    if let Some(fits) = &products.energy_fits {
        for ((mom, _), fit) in &fits.results {
            let path = DatasetPath::root("effective_energy")
                .push("fits")
                .momentum(mom)
                .push(fit.window.label());
            store.write_value(&path, "fit", fit)?;
        }
    }

    if let Some(three) = &products.three_point {
        store.write_complex_set(&three.plain, three_point_path)?;
        store.write_complex_set(&three.averaged, |k| {
            ratio_path(DatasetPath::root("three_point").push("averaged"), k)
        })?;
        store.write_complex_set(&three.symmetrized, |k| {
            ratio_path(DatasetPath::root("three_point").push("symmetrized"), k)
        })?;
    }

    if let Some(ratios) = &products.ratios {
        if config.ratio.write_plain {
            store.write_set(&ratios.plain, |(k, c)| {
                ratio_path(DatasetPath::root("ratio").push("plain"), k).channel(*c)
            })?;
        }
        if config.ratio.write_sums {
            store.write_set(&ratios.sum, |(k, c)| {
                ratio_path(DatasetPath::root("ratio").push("sum"), k).channel(*c)
            })?;
            store.write_set(&ratios.reduced_sum, |(k, c)| {
                ratio_path(DatasetPath::root("ratio").push("r-sum"), k).channel(*c)
            })?;
            for series in ratios.series_keys() {
                for channel in Channel::ALL {
                    let sum = series_path(DatasetPath::root("ratio").push("sum_vs_tsep"), &series)
                        .channel(channel);
                    store.write_value(&sum, "series", &ratios.sum_vs_tsep(&series, channel))?;
                    let rsum =
                        series_path(DatasetPath::root("ratio").push("r-sum_vs_tsep"), &series)
                            .channel(channel);
                    store.write_value(
                        &rsum,
                        "series",
                        &ratios.reduced_sum_vs_tsep(&series, channel),
                    )?;
                }
            }
        }
    }

    for fits in &products.plateau {
        let base = DatasetPath::root("plateau").push(fits.spec.label.clone());
        if fits.spec.write {
            for ((key, channel), result) in &fits.results {
                let path = ratio_path(base.clone(), key).channel(*channel);
                for fit in &result.windows {
                    let window = path.clone().push(fit.window.label());
                    store.write_dataset(&window.clone().push("value"), &fit.value, &fit.value_mean)?;
                    store.write_dataset(&window.push("chi"), &fit.chi, &fit.chi_mean)?;
                }
                store.write_value(&path, "optimal", &result.optimal)?;
            }
        }
        write_failures(
            store,
            &base,
            fits.failures.iter().map(|((k, c), e)| (ChannelKey(k, *c), e)),
        )?;
    }

    for fits in &products.summation {
        let base = DatasetPath::root("summation").push(fits.spec.label.clone());
        if fits.spec.write {
            for (key, result) in &fits.results {
                let path = series_path(base.clone(), &key.series)
                    .channel(key.channel)
                    .push(key.cutoff_label());
                store.write_dataset(&path.clone().push("slope"), &result.slope, &result.slope_mean)?;
                store.write_dataset(
                    &path.clone().push("intercept"),
                    &result.intercept,
                    &result.intercept_mean,
                )?;
                store.write_dataset(&path.clone().push("chi"), &result.chi, &result.chi_mean)?;
                store.write_value(&path, "separations", &result.separations)?;
                if let Some(band) = &result.band {
                    store.write_value(&path, "band", band)?;
                }
            }
        }
        write_failures(store, &base, fits.failures.iter())?;
    }

    if let Some(itd) = &products.itd {
        for (label, values) in &itd.by_label {
            store.write_set(values, |(series, channel)| {
                series_path(DatasetPath::root("itd").push(label.clone()), series).channel(*channel)
            })?;
        }
        for (label, failures) in &itd.failures {
            write_failures(
                store,
                &DatasetPath::root("itd").push(label.clone()),
                failures.iter().map(|((s, c), e)| (ChannelKey(s, *c), e)),
            )?;
        }
    }
    Ok(())
}

/// Provenance of a finished run.
pub fn provenance(
    config: &RunConfig,
    ensemble: &RawEnsemble,
    products: &Products,
    stage: Stage,
) -> Result<RunProvenance, MelaError> {
    let mut tool_versions = BTreeMap::new();
    tool_versions.insert("mela".to_string(), env!("CARGO_PKG_VERSION").to_string());
    Ok(RunProvenance {
        schema_version: SchemaVersion::default(),
        config_hash: config.hash()?,
        stage: stage.as_str().to_string(),
        ncfg: ensemble.ncfg,
        binsize: config.analysis.binsize,
        nbins: products.two_point.nbins,
        seed: ensemble.seed,
        created_at: Utc::now().to_rfc3339(),
        tool_versions,
    })
}

/// Loads the data, runs up to `stage` and writes the output tree.
pub fn execute(config: &RunConfig, stage: Stage, store: &mut JsonStore) -> Result<Products, MelaError> {
    let ensemble = source::load(config)?;
    let products = compute(config, &ensemble, stage)?;
    write(config, &products, store)?;
    store.write_provenance(&provenance(config, &ensemble, &products, stage)?)?;
    info!(
        stage = stage.as_str(),
        datasets = store.datasets(),
        root = %store.root().display(),
        "analysis written"
    );
    Ok(products)
}
