use std::collections::BTreeMap;

use mela_core::keys::{
    Channel, Displacement, Insertion, Momentum, OperatorPair, SeriesKey, ThreePointKey,
    TwoPointKey,
};
use mela_core::MelaError;
use mela_corr::{
    AnalysisParams, AveragingPlan, RawSample, ThreePointData, ThreePointStatistics,
    TwoPointData, TwoPointStatistics,
};
use mela_fit::{
    BandSpec, FitType, OptimalWindow, PlateauFitSpec, PlateauFits, SummationFitSpec,
    SummationFits,
};
use mela_itd::{ItdSelection, ItdSet, ItdSpec};
use mela_ratio::Ratios;
use num_complex::Complex64;

const P: Momentum = Momentum::new(0, 0, 2);
const Z: Displacement = Displacement(3);
const SEPARATIONS: [u32; 3] = [4, 6, 8];

fn matrix_element(mom: Momentum, disp: Displacement) -> Complex64 {
    match (mom.is_zero(), disp.is_zero()) {
        (true, true) => Complex64::new(1.0, 0.0),
        (true, false) => Complex64::new(0.8, 0.0),
        (false, true) => Complex64::new(0.9, 0.0),
        (false, false) => Complex64::new(0.6, 0.3),
    }
}

fn noise(cfg: usize) -> f64 {
    1.0 + 0.05 * (((cfg * 7) % 5) as f64 - 2.0) / 2.0
}

fn eta(cfg: usize) -> f64 {
    1.0 + 0.02 * (((cfg * 3) % 7) as f64 / 7.0 - 0.5)
}

fn c2(mom: Momentum, cfg: usize, t: usize) -> f64 {
    let energy = if mom.is_zero() { 0.4 } else { 0.55 };
    (-energy * t as f64).exp() * noise(cfg)
}

/// Excited-state shape shared by every key.
fn shape(tins: usize, tsep: usize) -> f64 {
    1.0 + 0.05 * (-(tins as f64)).exp() + 0.05 * (-((tsep - tins) as f64)).exp()
}

fn ratios() -> Ratios {
    ratios_without(None)
}

/// Ratios with the three-point data of one `(momentum, tsep)` pair left out.
fn ratios_without(missing: Option<(Momentum, u32)>) -> Ratios {
    let ncfg = 36;
    let mut two = TwoPointData::default();
    let mut three = ThreePointData::default();
    for mom in [Momentum::ZERO, P] {
        two.samples.insert(
            TwoPointKey {
                mom,
                t0: 0,
                ops: OperatorPair::new("N1", "N1"),
                row: 1,
            },
            RawSample::from_fn(ncfg, 16, |cfg, t| Complex64::new(c2(mom, cfg, t), 0.0)),
        );
        for disp in [Displacement::ZERO, Z] {
            for tsep in SEPARATIONS {
                if missing == Some((mom, tsep)) {
                    continue;
                }
                let m = matrix_element(mom, disp);
                three.samples.insert(
                    ThreePointKey {
                        mom,
                        tsep,
                        t0: 0,
                        disp,
                        ops: OperatorPair::new("N1", "N1"),
                        row: 1,
                        insertion: Insertion::new("gt"),
                    },
                    RawSample::from_fn(ncfg, tsep as usize, |cfg, tins| {
                        m * c2(mom, cfg, tsep as usize) * eta(cfg) * shape(tins, tsep as usize)
                    }),
                );
            }
        }
    }
    let plan = AveragingPlan::new([Momentum::ZERO, P], [Displacement::ZERO, Z]).expect("plan");
    let params = AnalysisParams::new(3).expect("params");
    let two = TwoPointStatistics::compute(&two, &plan, &params).expect("two-point");
    let three = ThreePointStatistics::compute(&three, &plan, &params).expect("three-point");
    Ratios::construct(&two, &three).expect("ratios")
}

fn plateau(label: &str, chi_criterion: f64) -> PlateauFitSpec {
    PlateauFitSpec {
        label: label.to_string(),
        fit_type: FitType::Constant,
        chi_criterion,
        write: true,
    }
}

fn expected_itd(channel: Channel) -> f64 {
    let center = matrix_element(P, Z);
    let numerator = match channel {
        Channel::Re => center.re,
        Channel::Im => center.im,
    };
    (numerator / matrix_element(P, Displacement::ZERO).re)
        * (matrix_element(Momentum::ZERO, Displacement::ZERO).re
            / matrix_element(Momentum::ZERO, Z).re)
}

fn center_key() -> SeriesKey {
    SeriesKey {
        mom: P,
        disp: Z,
        insertion: Insertion::new("gt"),
    }
}

fn assert_itd(set: &ItdSet, label: &str) {
    let values = &set.by_label[label];
    for channel in Channel::ALL {
        let bins = values.bins(&(center_key(), channel)).expect("itd bins");
        for b in 0..bins.nbins() {
            assert!(
                (bins.get(b, 0) - expected_itd(channel)).abs() < 1e-10,
                "{label} {channel} bin {b}"
            );
        }
    }
    // The zero-momentum, zero-displacement point is one by construction.
    let origin = SeriesKey {
        mom: Momentum::ZERO,
        disp: Displacement::ZERO,
        insertion: Insertion::new("gt"),
    };
    let (mean, _) = values.mean(&(origin, Channel::Re)).expect("origin").at(0);
    assert!((mean - 1.0).abs() < 1e-12);
}

#[test]
fn plateau_and_summation_itds_cancel_common_factors() {
    let ratios = ratios();
    let plat = PlateauFits::run(&plateau("plat", 1e300), &ratios).expect("plateau");
    let summ = SummationFits::run(
        &SummationFitSpec {
            label: "summ".to_string(),
            fit_type: FitType::Linear,
            tsep_low: vec![4],
            bands: BandSpec::default(),
            write: true,
        },
        &ratios,
    )
    .expect("summation");

    let mut optimal_fits = BTreeMap::new();
    optimal_fits.insert(
        "plat".to_string(),
        ItdSelection::Plateau {
            tsep: 8,
            fallback: None,
        },
    );
    optimal_fits.insert("summ".to_string(), ItdSelection::Summation { tsep_low: 4 });
    let spec = ItdSpec { optimal_fits };

    let set = ItdSet::evaluate(&spec, &ratios, &[plat], &[summ]).expect("itd");
    assert_itd(&set, "plat");
    assert_itd(&set, "summ");
}

#[test]
fn fallback_range_replaces_missing_optimal_window() {
    let ratios = ratios();
    let plat = PlateauFits::run(&plateau("strict", 1e-300), &ratios).expect("plateau");
    let result = plat
        .get(&(center_key().with_tsep(8), Channel::Re))
        .expect("fit");
    assert_eq!(result.optimal, OptimalWindow::NotFound);

    let mut optimal_fits = BTreeMap::new();
    optimal_fits.insert(
        "strict".to_string(),
        ItdSelection::Plateau {
            tsep: 8,
            fallback: Some([2, 6]),
        },
    );
    let spec = ItdSpec { optimal_fits };
    let set = ItdSet::evaluate(&spec, &ratios, &[plat.clone()], &[]).expect("itd");
    assert_itd(&set, "strict");

    let mut without = spec.clone();
    without.optimal_fits.insert(
        "strict".to_string(),
        ItdSelection::Plateau {
            tsep: 8,
            fallback: None,
        },
    );
    let set = ItdSet::evaluate(&without, &ratios, &[plat], &[]).expect("itd");
    assert!(set.by_label["strict"].is_empty());
    let err = &set.failures["strict"][&(center_key(), Channel::Re)];
    assert!(matches!(err, MelaError::InvalidInput(_)));
    assert!(err.to_string().contains("missing-fallback"));
}

#[test]
fn unavailable_fits_fail_only_their_own_keys() {
    let ratios = ratios_without(Some((P, 6)));
    let summ = SummationFits::run(
        &SummationFitSpec {
            label: "late".to_string(),
            fit_type: FitType::Linear,
            tsep_low: vec![6],
            bands: BandSpec::default(),
            write: false,
        },
        &ratios,
    )
    .expect("summation");
    assert!(!summ.failures.is_empty());

    let mut optimal_fits = BTreeMap::new();
    optimal_fits.insert("late".to_string(), ItdSelection::Summation { tsep_low: 6 });
    let set = ItdSet::evaluate(&ItdSpec { optimal_fits }, &ratios, &[], &[summ]).expect("itd");

    let values = &set.by_label["late"];
    for disp in [Displacement::ZERO, Z] {
        let series = SeriesKey {
            mom: Momentum::ZERO,
            disp,
            insertion: Insertion::new("gt"),
        };
        let (mean, _) = values.mean(&(series, Channel::Re)).expect("zero momentum").at(0);
        assert!((mean - 1.0).abs() < 1e-10, "disp {disp:?}");
    }

    let failures = &set.failures["late"];
    assert_eq!(failures.len(), 4);
    for channel in Channel::ALL {
        let err = &failures[&(center_key(), channel)];
        assert_eq!(err.info().code, "missing-reference");
        assert!(values.bins(&(center_key(), channel)).is_none());
    }
}

#[test]
fn unknown_label_is_rejected() {
    let spec: ItdSpec = serde_yaml::from_str(
        "optimal_fits:\n  nope:\n    kind: summation\n    tsep_low: 4\n",
    )
    .expect("yaml");
    let err = spec
        .validate(&Default::default(), &Default::default())
        .expect_err("unknown label");
    assert_eq!(err.info().code, "unknown-fit-label");
}
