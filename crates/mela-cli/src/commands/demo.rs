use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use mela_core::keys::{Displacement, Insertion, Momentum};
use mela_corr::AnalysisParams;
use mela_fit::{BandSpec, EffectiveEnergySpec, FitType, PlateauFitSpec, SummationFitSpec};
use mela_itd::{ItdSelection, ItdSpec};
use serde_json::{json, Value};

use crate::commands::summarize;
use crate::config::{RatioSpec, RunConfig, SourceConfig, SyntheticSpec, ThreePointSpec, TwoPointSpec};
use crate::pipeline::{self, Stage};
use crate::source;
use crate::store::JsonStore;

const DEMO_NT: usize = 16;
const DEMO_SEPARATIONS: [u32; 4] = [4, 6, 8, 10];

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Master seed of the synthetic ensemble.
    #[arg(long, default_value_t = 2024)]
    pub seed: u64,
    /// Number of gauge configurations.
    #[arg(long, default_value_t = 64)]
    pub ncfg: usize,
    /// Jackknife block size.
    #[arg(long, default_value_t = 4)]
    pub binsize: usize,
    /// Relative noise per configuration and time slice.
    #[arg(long, default_value_t = 0.005)]
    pub noise: f64,
    /// Averaged momenta as `x,y,z`; zero momentum is always added.
    #[arg(
        long = "momentum",
        allow_hyphen_values = true,
        default_values = ["0,0,1", "0,0,2"]
    )]
    pub momenta: Vec<Momentum>,
    /// Displacements; zero is always added.
    #[arg(long = "displacement", allow_negative_numbers = true, default_values_t = [2, 4])]
    pub displacements: Vec<i32>,
    /// Optional output directory for the full dataset tree.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

fn demo_config(args: &DemoArgs) -> Result<RunConfig, Box<dyn Error>> {
    let mut momenta = args.momenta.clone();
    momenta.push(Momentum::ZERO);
    let mut displacements: Vec<Displacement> =
        args.displacements.iter().map(|&z| Displacement(z)).collect();
    displacements.push(Displacement::ZERO);

    let mut optimal_fits = BTreeMap::new();
    optimal_fits.insert(
        "plat".to_string(),
        ItdSelection::Plateau {
            tsep: 8,
            fallback: Some([2, 6]),
        },
    );
    optimal_fits.insert("summ".to_string(), ItdSelection::Summation { tsep_low: 4 });

    let config = RunConfig {
        analysis: AnalysisParams::new(args.binsize)?,
        source: SourceConfig::Synthetic(SyntheticSpec {
            seed: args.seed,
            ncfg: args.ncfg,
            mass: 0.5,
            spatial_extent: DEMO_NT,
            noise: args.noise,
            both_signs: true,
        }),
        two_point: TwoPointSpec {
            nt: DEMO_NT,
            momenta,
        },
        three_point: Some(ThreePointSpec {
            separations: DEMO_SEPARATIONS.to_vec(),
            displacements,
            insertions: vec![Insertion::new("gt")],
        }),
        ratio: RatioSpec::default(),
        effective_energy: EffectiveEnergySpec {
            fits: vec![[3, 8]],
        },
        plateau_fits: vec![PlateauFitSpec {
            label: "plat".to_string(),
            fit_type: FitType::Constant,
            chi_criterion: 2.0,
            write: true,
        }],
        summation_fits: vec![SummationFitSpec {
            label: "summ".to_string(),
            fit_type: FitType::Linear,
            tsep_low: vec![4, 6],
            bands: BandSpec {
                evaluate: true,
                npoints: 20,
            },
            write: true,
        }],
        itd: ItdSpec { optimal_fits },
    };
    config.validate()?;
    Ok(config)
}

pub fn run(args: &DemoArgs) -> Result<(), Box<dyn Error>> {
    let config = demo_config(args)?;
    let products = match &args.out {
        Some(out) => {
            let mut store = JsonStore::create(out)?;
            pipeline::execute(&config, Stage::Itd, &mut store)?
        }
        None => {
            let ensemble = source::load(&config)?;
            pipeline::compute(&config, &ensemble, Stage::Itd)?
        }
    };

    let mut itd = serde_json::Map::new();
    if let Some(set) = &products.itd {
        for (label, values) in &set.by_label {
            let entries: Vec<Value> = values
                .iter()
                .map(|((series, channel), _, mean)| {
                    json!({
                        "mom": series.mom.tag(),
                        "disp": series.disp.0,
                        "channel": channel.as_str(),
                        "mean": mean.mean[0],
                        "error": mean.error[0],
                    })
                })
                .collect();
            itd.insert(label.clone(), Value::Array(entries));
        }
    }
    let mut report = summarize(&products);
    report["seed"] = args.seed.into();
    report["config_hash"] = config.hash()?.into();
    report["itd"] = Value::Object(itd);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
