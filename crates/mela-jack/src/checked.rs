//! Checked element-wise operations that yield undefined values instead of failing.

/// Natural log of `num / den`, or `None` when the ratio is not a positive finite number.
///
/// Callers store `None` as `f64::NAN` so one bad time slice or bin stays
/// local to its element.
pub fn ln_ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 || !num.is_finite() || !den.is_finite() {
        return None;
    }
    let ratio = num / den;
    if ratio > 0.0 && ratio.is_finite() {
        Some(ratio.ln())
    } else {
        None
    }
}

/// Element-wise quotient, or `None` when the denominator vanishes or the result is not finite.
pub fn ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    let value = num / den;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ln_ratio_rejects_non_positive_arguments() {
        assert_eq!(ln_ratio(1.0, 0.0), None);
        assert_eq!(ln_ratio(-1.0, 2.0), None);
        assert_eq!(ln_ratio(0.0, 2.0), None);
        assert_eq!(ln_ratio(f64::NAN, 2.0), None);
        let value = ln_ratio(std::f64::consts::E, 1.0).unwrap();
        assert!((value - 1.0).abs() < 1e-15);
    }

    #[test]
    fn ratio_guards_zero_denominator() {
        assert_eq!(ratio(1.0, 0.0), None);
        assert_eq!(ratio(3.0, 2.0), Some(1.5));
    }
}
