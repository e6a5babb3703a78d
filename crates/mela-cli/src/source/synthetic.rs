//! Deterministic synthetic ensembles with known energies and matrix elements.

use std::collections::BTreeSet;
use std::f64::consts::PI;

use mela_core::keys::{Displacement, Insertion, Momentum, OperatorPair, ThreePointKey, TwoPointKey};
use mela_core::rng::{substream_id, EnsembleRng};
use mela_corr::{RawSample, ThreePointData, TwoPointData};
use num_complex::Complex64;

use crate::config::SyntheticSpec;

/// Continuum dispersion relation `sqrt(m^2 + (2 pi p / L)^2)`.
pub fn energy(spec: &SyntheticSpec, mom: &Momentum) -> f64 {
    let scale = 2.0 * PI / spec.spatial_extent as f64;
    let p2: f64 = mom.0.iter().map(|&c| (scale * c as f64).powi(2)).sum();
    (spec.mass * spec.mass + p2).sqrt()
}

/// Matrix element with Ioffe time `2 pi p_z z / L` and a Gaussian falloff in `z`.
///
/// Negating either the momentum or the displacement conjugates it.
pub fn matrix_element(spec: &SyntheticSpec, mom: &Momentum, disp: &Displacement) -> Complex64 {
    let nu = 2.0 * PI * (mom.0[2] * disp.0) as f64 / spec.spatial_extent as f64;
    let falloff = (-(disp.0 as f64 / 6.0).powi(2)).exp();
    Complex64::from_polar(falloff, nu)
}

fn with_partners<T: Ord + Copy>(values: &[T], both: bool, negate: impl Fn(&T) -> T) -> Vec<T> {
    let mut out: BTreeSet<T> = values.iter().copied().collect();
    if both {
        out.extend(values.iter().map(negate));
    }
    out.into_iter().collect()
}

fn noisy(rng: &mut EnsembleRng, sigma: f64) -> f64 {
    1.0 + rng.normal(0.0, sigma)
}

/// Two-point data `exp(-E t)` with relative noise for every momentum and,
/// when requested, its parity partner.
pub fn two_point(spec: &SyntheticSpec, momenta: &[Momentum], nt: usize) -> TwoPointData {
    let mut data = TwoPointData::default();
    for mom in with_partners(momenta, spec.both_signs, Momentum::negated) {
        let key = TwoPointKey {
            mom,
            t0: 0,
            ops: OperatorPair::new("N1", "N1"),
            row: 1,
        };
        let mut rng = EnsembleRng::substream(spec.seed, substream_id(&format!("c2/{}", mom.tag())));
        let e = energy(spec, &mom);
        let sample = RawSample::from_fn(spec.ncfg, nt, |_, t| {
            Complex64::new((-e * t as f64).exp() * noisy(&mut rng, spec.noise), 0.0)
        });
        data.samples.insert(key, sample);
    }
    data
}

/// Three-point data `M(p, z) exp(-E tsep)` with relative noise, flat in the
/// insertion time.
pub fn three_point(
    spec: &SyntheticSpec,
    momenta: &[Momentum],
    displacements: &[Displacement],
    separations: &[u32],
    insertions: &[Insertion],
) -> ThreePointData {
    let mut data = ThreePointData::default();
    let displacements = if displacements.is_empty() {
        vec![Displacement::ZERO]
    } else {
        displacements.to_vec()
    };
    let momenta = with_partners(momenta, spec.both_signs, Momentum::negated);
    let displacements = with_partners(&displacements, spec.both_signs, Displacement::negated);
    for mom in &momenta {
        let e = energy(spec, mom);
        for disp in &displacements {
            let m = matrix_element(spec, mom, disp);
            for &tsep in separations {
                for insertion in insertions {
                    let key = ThreePointKey {
                        mom: *mom,
                        tsep,
                        t0: 0,
                        disp: *disp,
                        ops: OperatorPair::new("N1", "N1"),
                        row: 1,
                        insertion: insertion.clone(),
                    };
                    let label = format!("c3/{}/{}/{}/{}", mom.tag(), disp, tsep, insertion);
                    let mut rng = EnsembleRng::substream(spec.seed, substream_id(&label));
                    let c2 = (-e * tsep as f64).exp();
                    let sample = RawSample::from_fn(spec.ncfg, tsep as usize, |_, _| {
                        m * c2 * noisy(&mut rng, spec.noise)
                    });
                    data.samples.insert(key, sample);
                }
            }
        }
    }
    data
}
