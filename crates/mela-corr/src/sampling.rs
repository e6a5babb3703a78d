//! Jackknife sampling of whole keyed sample maps.

use std::collections::BTreeMap;

use mela_core::errors::MelaError;
use mela_jack::{sample_columns, JackknifeSet};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::raw::RawSample;

/// Bins every sample column by column and collects bins and means per key.
///
/// Keys own disjoint data, so sampling runs in parallel; the set is keyed by
/// a `BTreeMap` and iterates in key order regardless of scheduling.
pub fn jackknife_all<K>(
    samples: &BTreeMap<K, RawSample>,
    binsize: usize,
) -> Result<JackknifeSet<K, Complex64>, MelaError>
where
    K: Ord + Clone + Send + Sync,
{
    let binned = samples
        .par_iter()
        .map(|(key, raw)| {
            sample_columns(raw.as_slice(), raw.ncfg(), raw.nt(), binsize)
                .map(|bins| (key.clone(), bins))
        })
        .collect::<Result<Vec<_>, MelaError>>()?;
    let mut set = JackknifeSet::new();
    for (key, bins) in binned {
        set.insert(key, bins)?;
    }
    Ok(set)
}
