use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;

use crate::commands::summarize;
use crate::config::RunConfig;
use crate::pipeline::{self, Stage};
use crate::store::JsonStore;
use crate::write_json;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// YAML run configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory of the dataset tree.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(args: &AnalyzeArgs, stage: Stage) -> Result<(), Box<dyn Error>> {
    let config = RunConfig::load(&args.config)?;
    let mut store = JsonStore::create(&args.out)?;
    let products = pipeline::execute(&config, stage, &mut store)?;

    let mut summary = summarize(&products);
    summary["stage"] = stage.as_str().into();
    summary["datasets"] = store.datasets().into();
    summary["config_hash"] = config.hash()?.into();
    write_json(args.out.join("summary.json"), &summary)?;

    // Resolved configuration; its hash is the one in provenance.json.
    fs::write(args.out.join("config.yaml"), serde_yaml::to_string(&config)?)?;
    Ok(())
}
