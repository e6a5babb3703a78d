use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;

const SYNTHETIC: &str = r#"
analysis:
  binsize: 2
source:
  kind: synthetic
  seed: 5
  ncfg: 24
two_point:
  nt: 12
  momenta: [[0, 0, 0], [0, 0, 1]]
three_point:
  separations: [4, 6, 8]
  displacements: [0, 2]
  insertions: [gt]
effective_energy:
  fits: [[2, 6]]
plateau_fits:
  - label: plat
    chi_criterion: 1.0e6
summation_fits:
  - label: summ
    tsep_low: [4]
    bands: { evaluate: true, npoints: 5 }
itd:
  optimal_fits:
    plat: { kind: plateau, tsep: 8, fallback: [2, 6] }
    summ: { kind: summation, tsep_low: 4 }
"#;

fn mela(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_mela"))
        .args(args)
        .output()
        .expect("run mela")
}

fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path).unwrap_or_else(|err| panic!("{}: {err}", path.display()));
    serde_json::from_str(&text).expect("json")
}

#[test]
fn itd_run_writes_the_dataset_tree() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("run.yaml");
    fs::write(&config, SYNTHETIC).expect("write config");
    let out = dir.path().join("out");

    let output = mela(&[
        "itd",
        "--config",
        config.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let provenance = read_json(&out.join("provenance.json"));
    assert_eq!(provenance["stage"], "itd");
    assert_eq!(provenance["nbins"], 12);
    assert_eq!(provenance["seed"], 5);
    assert_eq!(provenance["config_hash"].as_str().map(str::len), Some(64));

    let c2 = read_json(&out.join("two_point/symmetrized/mom_0_0_+1/Re/mean.json"));
    assert_eq!(c2["mean"].as_array().map(Vec::len), Some(12));

    let ratio = out.join("ratio/plain/mom_0_0_+1/tsnk_8/disp_z+2/ins_gt/Im/bins.json");
    assert!(ratio.exists());
    let series = read_json(&out.join("ratio/sum_vs_tsep/mom_0_0_0/disp_0/ins_gt/Re/series.json"));
    assert_eq!(series["tsep"], serde_json::json!([4, 6, 8]));

    let optimal = read_json(&out.join("plateau/plat/mom_0_0_0/tsnk_8/disp_0/ins_gt/Re/optimal.json"));
    assert_eq!(optimal, 0);

    let slope = out.join("summation/summ/mom_0_0_+1/disp_z+2/ins_gt/Re/tL4/slope/mean.json");
    assert!(slope.exists());

    let origin = read_json(&out.join("itd/summ/mom_0_0_0/disp_0/ins_gt/Re/mean.json"));
    let value = origin["mean"][0].as_f64().expect("itd mean");
    assert!((value - 1.0).abs() < 1e-12);

    let summary = read_json(&out.join("summary.json"));
    assert_eq!(summary["stage"], "itd");
    assert!(out.join("config.yaml").exists());
}

#[test]
fn two_point_run_reads_ascii_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (ncfg, nt) = (4, 6);
    let mut text = String::new();
    for cfg in 0..ncfg {
        for t in 0..nt {
            let value = (-0.3 * t as f64).exp() * (1.0 + 0.01 * cfg as f64);
            text.push_str(&format!("{t} {value:.12e} 0.0\n"));
        }
    }
    fs::write(dir.path().join("c2.dat"), text).expect("write data");
    fs::write(
        dir.path().join("manifest.json"),
        r#"{"ncfg": 4, "two_point": [
            {"mom": [0, 0, 0], "src": "N1", "snk": "N1", "file": "c2.dat"}
        ]}"#,
    )
    .expect("write manifest");
    let config = dir.path().join("run.yaml");
    fs::write(
        &config,
        "source: { kind: ascii, manifest: manifest.json }\n\
         two_point: { nt: 6, momenta: [[0, 0, 0]] }\n",
    )
    .expect("write config");
    let out = dir.path().join("out");

    let output = mela(&[
        "effective-energy",
        "--config",
        config.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let energy = read_json(&out.join("effective_energy/symmetrized/mom_0_0_0/mean.json"));
    let e0 = energy["mean"][0].as_f64().expect("energy");
    assert!((e0 - 0.3).abs() < 1e-9);
    assert!(out
        .join("two_point/plain/mom_0_0_0/t0_0/src_snk_N1_N1/row_1/Im/bins.json")
        .exists());
}

#[test]
fn invalid_configuration_fails_naming_the_field() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("run.yaml");
    fs::write(&config, SYNTHETIC.replace("[4, 6, 8]", "[6, 4, 8]")).expect("write config");
    let output = mela(&[
        "ratio",
        "--config",
        config.to_str().unwrap(),
        "--out",
        dir.path().join("out").to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("three_point.separations"), "{stderr}");
}

#[test]
fn short_ascii_file_names_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("short.dat"), "0 1.0 0.0\n").expect("write data");
    fs::write(
        dir.path().join("manifest.json"),
        r#"{"ncfg": 2, "two_point": [
            {"mom": [0, 0, 0], "src": "N1", "snk": "N1", "file": "short.dat"}
        ]}"#,
    )
    .expect("write manifest");
    let config = dir.path().join("run.yaml");
    fs::write(
        &config,
        "source: { kind: ascii, manifest: manifest.json }\n\
         two_point: { nt: 4, momenta: [[0, 0, 0]] }\n",
    )
    .expect("write config");
    let output = mela(&[
        "two-point",
        "--config",
        config.to_str().unwrap(),
        "--out",
        dir.path().join("out").to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("short.dat"));
}

#[test]
fn demo_prints_itd_report() {
    let output = mela(&["demo", "--ncfg", "32"]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["seed"], 2024);
    let plat = report["itd"]["plat"].as_array().expect("plateau itd");
    assert!(!plat.is_empty());
    let origin = plat
        .iter()
        .find(|entry| entry["mom"] == "0,0,0" && entry["disp"] == 0 && entry["channel"] == "Re")
        .expect("origin entry");
    assert!((origin["mean"].as_f64().expect("mean") - 1.0).abs() < 1e-12);
}

#[test]
fn itd_failures_are_written_next_to_surviving_labels() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("run.yaml");
    let strict = SYNTHETIC
        .replace("chi_criterion: 1.0e6", "chi_criterion: 1.0e-300")
        .replace(", fallback: [2, 6]", "");
    fs::write(&config, strict).expect("write config");
    let out = dir.path().join("out");

    let output = mela(&[
        "itd",
        "--config",
        config.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let failures = read_json(&out.join("itd/plat/failures.json"));
    let records = failures.as_array().expect("records");
    assert!(!records.is_empty());
    assert!(records[0]["error"].to_string().contains("missing-reference"));

    let origin = read_json(&out.join("itd/summ/mom_0_0_0/disp_0/ins_gt/Re/mean.json"));
    assert!((origin["mean"][0].as_f64().expect("itd mean") - 1.0).abs() < 1e-12);
}
