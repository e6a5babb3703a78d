use mela_jack::{estimate, number_of_bins, sample, Bins};
use proptest::prelude::*;

proptest! {
    #[test]
    fn bin_count_leaves_less_than_one_block(ndata in 1usize..5000, binsize in 1usize..200) {
        prop_assume!(binsize <= ndata);
        let nbins = number_of_bins(ndata, binsize).unwrap();
        prop_assert!(nbins * binsize <= ndata);
        prop_assert!(ndata - nbins * binsize < binsize);
    }

    #[test]
    fn constant_series_has_zero_error(c in -1e3f64..1e3, ndata in 4usize..400, binsize in 1usize..5) {
        let nbins = number_of_bins(ndata, binsize).unwrap();
        prop_assume!(nbins >= 2);
        let series = vec![c; ndata];
        let bins = sample(&series, nbins, binsize).unwrap();
        for bin in &bins {
            prop_assert!((bin - c).abs() <= 1e-9 * c.abs().max(1.0));
        }
        let result = estimate(&Bins::from_scalars(bins), nbins, 1).unwrap();
        let (mean, err) = result.scalar().unwrap();
        prop_assert!((mean - c).abs() <= 1e-9 * c.abs().max(1.0));
        prop_assert!(err <= 1e-9 * c.abs().max(1.0));
    }
}

#[test]
fn jackknife_error_matches_standard_error_for_unit_blocks() {
    // With binsize 1 the jackknife error equals the standard error of the mean.
    let series: Vec<f64> = (0..50).map(|i| ((i * 37) % 11) as f64).collect();
    let n = series.len() as f64;
    let bins = sample(&series, series.len(), 1).unwrap();
    let result = estimate(&Bins::from_scalars(bins), series.len(), 1).unwrap();
    let (mean, err) = result.scalar().unwrap();

    let direct = series.iter().sum::<f64>() / n;
    let var = series.iter().map(|x| (x - direct).powi(2)).sum::<f64>() / (n - 1.0);
    assert!((mean - direct).abs() < 1e-12);
    assert!((err - (var / n).sqrt()).abs() < 1e-12);
}
