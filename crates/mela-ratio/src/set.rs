//! Ratios for every symmetrized three-point key.

use std::collections::{BTreeMap, BTreeSet};

use mela_core::errors::{ErrorInfo, MelaError};
use mela_core::keys::{Channel, Momentum, RatioKey, SeriesKey};
use mela_corr::{channel_bins, ThreePointStatistics, TwoPointStatistics};
use mela_jack::{Bins, JackknifeSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ratio::{plain_ratio, reduced_summed_ratio, summed_ratio};

/// Key of one real-valued ratio dataset.
pub type RatioChannelKey = (RatioKey, Channel);

/// Plain, summed and reduced-summed ratios with their jackknife means.
#[derive(Debug, Clone, PartialEq)]
pub struct Ratios {
    /// Jackknife bins shared by every dataset.
    pub nbins: usize,
    /// Per insertion time; width `tsep`.
    pub plain: JackknifeSet<RatioChannelKey, f64>,
    /// Scalar per separation.
    pub sum: JackknifeSet<RatioChannelKey, f64>,
    /// Scalar per separation, keyed by the lower separation of each adjacent pair.
    pub reduced_sum: JackknifeSet<RatioChannelKey, f64>,
}

/// A scalar ratio laid out against the separation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeparationSeries {
    /// Separations, ascending.
    pub tsep: Vec<u32>,
    /// Jackknife means.
    pub mean: Vec<f64>,
    /// Jackknife errors.
    pub error: Vec<f64>,
}

struct SeriesOutput {
    plain: Vec<(RatioChannelKey, Bins<f64>)>,
    sum: Vec<(RatioChannelKey, Bins<f64>)>,
    reduced_sum: Vec<(RatioChannelKey, Bins<f64>)>,
}

fn incompatible(code: &str, message: &str) -> MelaError {
    MelaError::IncompatibleInputs(ErrorInfo::new(code, message))
}

fn check_compatible(
    two: &TwoPointStatistics,
    three: &ThreePointStatistics,
) -> Result<(), MelaError> {
    if two.nbins != three.nbins {
        return Err(MelaError::IncompatibleInputs(
            ErrorInfo::new("nbins-mismatch", "two- and three-point bin counts differ")
                .with_context("two_point", two.nbins.to_string())
                .with_context("three_point", three.nbins.to_string()),
        ));
    }
    let two_moms: BTreeSet<Momentum> = two.symmetrized.keys().copied().collect();
    let three_moms: BTreeSet<Momentum> = three.symmetrized.keys().map(|k| k.mom).collect();
    if two_moms != three_moms {
        let tags = |set: &BTreeSet<Momentum>| {
            set.iter().map(Momentum::tag).collect::<Vec<_>>().join(" ")
        };
        return Err(MelaError::IncompatibleInputs(
            ErrorInfo::new(
                "momentum-mismatch",
                "two- and three-point averaged momenta differ",
            )
            .with_context("two_point", tags(&two_moms))
            .with_context("three_point", tags(&three_moms)),
        ));
    }
    Ok(())
}

fn series_ratios(
    series: &SeriesKey,
    separations: &[u32],
    two: &TwoPointStatistics,
    three: &ThreePointStatistics,
) -> Result<SeriesOutput, MelaError> {
    let c2_complex = two
        .symmetrized
        .bins(&series.mom)
        .ok_or_else(|| incompatible("two-point-missing", "no two-point data for momentum"))?;
    let c2 = channel_bins(c2_complex, Channel::Re);
    let mut out = SeriesOutput {
        plain: Vec::new(),
        sum: Vec::new(),
        reduced_sum: Vec::new(),
    };
    for channel in Channel::ALL {
        let mut sums: Vec<(u32, Bins<f64>)> = Vec::with_capacity(separations.len());
        for &tsep in separations {
            let key = series.with_tsep(tsep);
            let c3_complex = three.symmetrized.bins(&key).ok_or_else(|| {
                incompatible("three-point-missing", "no three-point data for key")
            })?;
            let c3 = channel_bins(c3_complex, channel);
            let plain = plain_ratio(&c3, &c2, tsep as usize).map_err(|err| {
                err.with_context("key", key.to_string())
                    .with_context("channel", channel.as_str())
            })?;
            let sum = summed_ratio(&plain);
            out.plain.push(((key.clone(), channel), plain));
            out.sum.push(((key, channel), sum.clone()));
            sums.push((tsep, sum));
        }
        for pair in sums.windows(2) {
            let (tsep_low, low) = &pair[0];
            let (tsep_high, high) = &pair[1];
            let rsum = reduced_summed_ratio(low, high, *tsep_low, *tsep_high)?;
            out.reduced_sum
                .push(((series.with_tsep(*tsep_low), channel), rsum));
        }
    }
    debug!(series = %series, separations = separations.len(), "ratios formed");
    Ok(out)
}

impl Ratios {
    /// Forms every ratio from symmetrized two- and three-point bins.
    ///
    /// The two-point denominator is always the real part.
    pub fn construct(
        two: &TwoPointStatistics,
        three: &ThreePointStatistics,
    ) -> Result<Self, MelaError> {
        check_compatible(two, three)?;

        let mut grouped: BTreeMap<SeriesKey, Vec<u32>> = BTreeMap::new();
        for key in three.symmetrized.keys() {
            grouped.entry(key.series_key()).or_default().push(key.tsep);
        }
        let groups: Vec<(SeriesKey, Vec<u32>)> = grouped.into_iter().collect();
        let outputs = groups
            .par_iter()
            .map(|(series, separations)| series_ratios(series, separations, two, three))
            .collect::<Result<Vec<_>, MelaError>>()?;

        let mut ratios = Ratios {
            nbins: two.nbins,
            plain: JackknifeSet::new(),
            sum: JackknifeSet::new(),
            reduced_sum: JackknifeSet::new(),
        };
        for output in outputs {
            for (key, bins) in output.plain {
                ratios.plain.insert(key, bins)?;
            }
            for (key, bins) in output.sum {
                ratios.sum.insert(key, bins)?;
            }
            for (key, bins) in output.reduced_sum {
                ratios.reduced_sum.insert(key, bins)?;
            }
        }
        for mom in two.symmetrized.keys() {
            let count = ratios.plain.keys().filter(|(k, _)| k.mom == *mom).count();
            info!(momentum = %mom, datasets = count, "ratio evaluation completed");
        }
        Ok(ratios)
    }

    /// Series keys with at least one ratio, ascending.
    pub fn series_keys(&self) -> Vec<SeriesKey> {
        self.sum
            .keys()
            .map(|(k, _)| k.series_key())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Separations of a series, ascending.
    pub fn separations(&self, series: &SeriesKey) -> Vec<u32> {
        self.sum
            .keys()
            .filter(|(k, c)| *c == Channel::Re && k.series_key() == *series)
            .map(|(k, _)| k.tsep)
            .collect()
    }

    /// Summed-ratio means of a series against the separation.
    pub fn sum_vs_tsep(&self, series: &SeriesKey, channel: Channel) -> SeparationSeries {
        scalar_series(&self.sum, series, channel)
    }

    /// Reduced-summed-ratio means of a series against the lower separation.
    pub fn reduced_sum_vs_tsep(&self, series: &SeriesKey, channel: Channel) -> SeparationSeries {
        scalar_series(&self.reduced_sum, series, channel)
    }
}

fn scalar_series(
    set: &JackknifeSet<RatioChannelKey, f64>,
    series: &SeriesKey,
    channel: Channel,
) -> SeparationSeries {
    let mut out = SeparationSeries {
        tsep: Vec::new(),
        mean: Vec::new(),
        error: Vec::new(),
    };
    for ((key, c), _, mean) in set.iter() {
        if *c != channel || key.series_key() != *series {
            continue;
        }
        if let Some((m, e)) = mean.scalar() {
            out.tsep.push(key.tsep);
            out.mean.push(m);
            out.error.push(e);
        }
    }
    out
}
