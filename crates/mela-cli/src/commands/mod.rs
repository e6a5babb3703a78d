pub mod analyze;
pub mod demo;

use serde_json::{json, Value};

use crate::pipeline::Products;

/// Counts reported in `summary.json` and by `mela demo`.
pub fn summarize(products: &Products) -> Value {
    let plateau: Vec<Value> = products
        .plateau
        .iter()
        .map(|fits| {
            let not_found = fits
                .results
                .values()
                .filter(|result| result.optimal_fit().is_none())
                .count();
            json!({
                "label": fits.spec.label,
                "fits": fits.results.len(),
                "failures": fits.failures.len(),
                "no_optimal_window": not_found,
            })
        })
        .collect();
    let summation: Vec<Value> = products
        .summation
        .iter()
        .map(|fits| {
            json!({
                "label": fits.spec.label,
                "fits": fits.results.len(),
                "failures": fits.failures.len(),
            })
        })
        .collect();
    json!({
        "nbins": products.two_point.nbins,
        "nt": products.two_point.nt,
        "momenta": products.two_point.symmetrized.len(),
        "ratios": products.ratios.as_ref().map(|r| r.plain.len()),
        "plateau": plateau,
        "summation": summation,
        "itd_labels": products
            .itd
            .as_ref()
            .map(|itd| itd.by_label.keys().cloned().collect::<Vec<_>>()),
        "itd_failures": products.itd.as_ref().map(|itd| {
            itd.failures
                .iter()
                .map(|(label, failures)| (label.clone(), failures.len()))
                .collect::<std::collections::BTreeMap<_, _>>()
        }),
    })
}
