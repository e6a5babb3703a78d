//! Momentum/displacement symmetrization rules.
//!
//! A correlator at `(p, z)` is related by parity and charge conjugation to
//! the correlators at `(-p, z)`, `(p, -z)` and `(-p, -z)`. The real part is
//! even under each negation and the imaginary part odd, so a partner negated
//! in `k` of the two indices enters with imaginary sign `(-1)^k`.

use mela_core::errors::{ErrorInfo, MelaError};
use mela_core::keys::{Displacement, Momentum};
use serde::{Deserialize, Serialize};

use crate::plan::Presence;
use crate::raw::RawSample;

/// Which member of a partner pair a single-partner rule uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Partner {
    /// The requested value itself.
    Requested,
    /// Its negation.
    Negated,
}

impl Partner {
    fn from_presence(presence: Presence) -> Option<Self> {
        match presence {
            Presence::Positive => Some(Partner::Requested),
            Presence::Negative => Some(Partner::Negated),
            Presence::Both | Presence::Neither => None,
        }
    }

    fn signs(self) -> &'static [bool] {
        match self {
            Partner::Requested => &[false],
            Partner::Negated => &[true],
        }
    }
}

/// The nine closed-form combination rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymmetrizationRule {
    /// `p = 0`, `z = 0`: the term itself.
    ZeroMomZeroDisp,
    /// `p = 0`, `z != 0`, both `+-z` present: weight 1/2 each.
    ZeroMomDispPair,
    /// `p = 0`, `z != 0`, one displacement present.
    ZeroMomDispSingle(Partner),
    /// `p != 0`, `z = 0`, both `+-p` present: weight 1/2 each.
    MomPairZeroDisp,
    /// `p != 0`, `z = 0`, one momentum present.
    MomSingleZeroDisp(Partner),
    /// `p != 0`, `z != 0`, both partners of both: weight 1/4 each.
    MomPairDispPair,
    /// `p != 0`, `z != 0`, both momenta, one displacement: weight 1/2 each.
    MomPairDispSingle(Partner),
    /// `p != 0`, `z != 0`, one momentum, both displacements: weight 1/2 each.
    MomSingleDispPair(Partner),
    /// `p != 0`, `z != 0`, one momentum and one displacement.
    MomSingleDispSingle(Partner, Partner),
}

/// One partner contributing to a symmetrized value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Term {
    /// Momentum of the partner.
    pub mom: Momentum,
    /// Displacement of the partner.
    pub disp: Displacement,
    /// `+1` or `-1` applied to the imaginary part.
    pub im_sign: f64,
}

fn inconsistent(mom: Momentum, disp: Displacement, message: &str) -> MelaError {
    MelaError::Inconsistency(
        ErrorInfo::new("no-symmetrization-rule", message)
            .with_context("momentum", mom.tag())
            .with_context("displacement", disp.to_string()),
    )
}

impl SymmetrizationRule {
    /// Selects the rule for `(mom, disp)` given which partners exist.
    ///
    /// For a zero momentum (or displacement) the two presence flags describe
    /// the same datum, so any presence other than `Neither` is accepted.
    pub fn classify(
        mom: Momentum,
        mom_presence: Presence,
        disp: Displacement,
        disp_presence: Presence,
    ) -> Result<Self, MelaError> {
        if !mom_presence.any() {
            return Err(inconsistent(mom, disp, "neither momentum partner is present"));
        }
        if !disp_presence.any() {
            return Err(inconsistent(
                mom,
                disp,
                "neither displacement partner is present",
            ));
        }
        let rule = match (mom.is_zero(), disp.is_zero()) {
            (true, true) => SymmetrizationRule::ZeroMomZeroDisp,
            (true, false) => match Partner::from_presence(disp_presence) {
                None => SymmetrizationRule::ZeroMomDispPair,
                Some(d) => SymmetrizationRule::ZeroMomDispSingle(d),
            },
            (false, true) => match Partner::from_presence(mom_presence) {
                None => SymmetrizationRule::MomPairZeroDisp,
                Some(m) => SymmetrizationRule::MomSingleZeroDisp(m),
            },
            (false, false) => match (
                Partner::from_presence(mom_presence),
                Partner::from_presence(disp_presence),
            ) {
                (None, None) => SymmetrizationRule::MomPairDispPair,
                (None, Some(d)) => SymmetrizationRule::MomPairDispSingle(d),
                (Some(m), None) => SymmetrizationRule::MomSingleDispPair(m),
                (Some(m), Some(d)) => SymmetrizationRule::MomSingleDispSingle(m, d),
            },
        };
        Ok(rule)
    }

    /// Weight of each term when every candidate partner is present.
    pub fn nominal_weight(&self) -> f64 {
        match self {
            SymmetrizationRule::ZeroMomZeroDisp
            | SymmetrizationRule::ZeroMomDispSingle(_)
            | SymmetrizationRule::MomSingleZeroDisp(_)
            | SymmetrizationRule::MomSingleDispSingle(_, _) => 1.0,
            SymmetrizationRule::ZeroMomDispPair
            | SymmetrizationRule::MomPairZeroDisp
            | SymmetrizationRule::MomPairDispSingle(_)
            | SymmetrizationRule::MomSingleDispPair(_) => 0.5,
            SymmetrizationRule::MomPairDispPair => 0.25,
        }
    }

    /// Candidate partners of `(mom, disp)` under this rule.
    pub fn terms(&self, mom: Momentum, disp: Displacement) -> Vec<Term> {
        const PAIR: &[bool] = &[false, true];
        const SELF: &[bool] = &[false];
        let (mom_signs, disp_signs) = match *self {
            SymmetrizationRule::ZeroMomZeroDisp => (SELF, SELF),
            SymmetrizationRule::ZeroMomDispPair => (SELF, PAIR),
            SymmetrizationRule::ZeroMomDispSingle(d) => (SELF, d.signs()),
            SymmetrizationRule::MomPairZeroDisp => (PAIR, SELF),
            SymmetrizationRule::MomSingleZeroDisp(m) => (m.signs(), SELF),
            SymmetrizationRule::MomPairDispPair => (PAIR, PAIR),
            SymmetrizationRule::MomPairDispSingle(d) => (PAIR, d.signs()),
            SymmetrizationRule::MomSingleDispPair(m) => (m.signs(), PAIR),
            SymmetrizationRule::MomSingleDispSingle(m, d) => (m.signs(), d.signs()),
        };
        let mut terms = Vec::with_capacity(mom_signs.len() * disp_signs.len());
        for &neg_mom in mom_signs {
            for &neg_disp in disp_signs {
                let flips = usize::from(neg_mom) + usize::from(neg_disp);
                terms.push(Term {
                    mom: if neg_mom { mom.negated() } else { mom },
                    disp: if neg_disp { disp.negated() } else { disp },
                    im_sign: if flips % 2 == 0 { 1.0 } else { -1.0 },
                });
            }
        }
        terms
    }

    /// Sums the present partners with their imaginary signs and divides by
    /// the number of terms actually summed.
    pub fn combine<'a>(
        &self,
        mom: Momentum,
        disp: Displacement,
        lookup: impl Fn(Momentum, Displacement) -> Option<&'a RawSample>,
    ) -> Result<RawSample, MelaError> {
        let mut acc: Option<RawSample> = None;
        let mut count = 0usize;
        for term in self.terms(mom, disp) {
            let Some(sample) = lookup(term.mom, term.disp) else {
                continue;
            };
            let total = acc.get_or_insert_with(|| sample.zeros_like());
            if !total.same_shape(sample) {
                return Err(MelaError::ShapeMismatch(
                    ErrorInfo::new("partner-shape", "symmetrization partners differ in shape")
                        .with_context("momentum", term.mom.tag())
                        .with_context("displacement", term.disp.to_string()),
                ));
            }
            total.accumulate(sample, term.im_sign);
            count += 1;
        }
        let mut total =
            acc.ok_or_else(|| inconsistent(mom, disp, "no partner of the rule is present"))?;
        total.scale(1.0 / count as f64);
        Ok(total)
    }
}

/// Classifies `(mom, disp)` against a lookup and combines its partners.
///
/// Presence of a momentum partner is judged over both displacement signs and
/// vice versa, so a rule is picked whenever any partner exists.
pub fn symmetrize<'a>(
    mom: Momentum,
    disp: Displacement,
    lookup: impl Fn(Momentum, Displacement) -> Option<&'a RawSample>,
) -> Result<(SymmetrizationRule, RawSample), MelaError> {
    let has = |m: Momentum, d: Displacement| lookup(m, d).is_some();
    let (p, np, z, nz) = (mom, mom.negated(), disp, disp.negated());
    let mom_presence = Presence::from_flags(has(p, z) || has(p, nz), has(np, z) || has(np, nz));
    let disp_presence = Presence::from_flags(has(p, z) || has(np, z), has(p, nz) || has(np, nz));
    let rule = SymmetrizationRule::classify(mom, mom_presence, disp, disp_presence)?;
    let sample = rule.combine(mom, disp, &lookup)?;
    Ok((rule, sample))
}
