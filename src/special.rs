//! Root bracketing shared by the Weibull shape estimate and the multimodal
//! mean search.
//!
//! Special functions (ln Γ, incomplete gamma and beta, normal and χ² CDFs)
//! come from `u_numflow::special`.

/// Finds a root of `f` in `[lo, hi]` by bisection.
///
/// Returns `None` if `f(lo)` and `f(hi)` have the same sign (or either is
/// not finite). Stops after `max_iter` halvings or once the bracket is
/// narrower than `1e-10`.
///
/// # Examples
///
/// ```
/// use u_distfit::special::bisect;
///
/// let root = bisect(|x| x * x - 2.0, 0.0, 2.0, 100).unwrap();
/// assert!((root - 2.0_f64.sqrt()).abs() < 1e-9);
/// assert!(bisect(|x| x * x + 1.0, 0.0, 2.0, 100).is_none());
/// ```
pub fn bisect(f: impl Fn(f64) -> f64, lo: f64, hi: f64, max_iter: usize) -> Option<f64> {
    let (mut lo, mut hi) = (lo, hi);
    let mut f_lo = f(lo);
    let f_hi = f(hi);
    if !f_lo.is_finite() || !f_hi.is_finite() {
        return None;
    }
    if f_lo == 0.0 {
        return Some(lo);
    }
    if f_hi == 0.0 {
        return Some(hi);
    }
    if f_lo.signum() == f_hi.signum() {
        return None;
    }

    for _ in 0..max_iter {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_mid == 0.0 || (hi - lo).abs() < 1e-10 {
            return Some(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    Some(0.5 * (lo + hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bisect_decreasing_function() {
        let root = bisect(|x| 10.0 - x * x * x, 0.0, 5.0, 200).unwrap();
        assert!((root - 10.0_f64.cbrt()).abs() < 1e-9);
    }

    #[test]
    fn bisect_exact_endpoint() {
        assert_eq!(bisect(|x| x - 1.0, 1.0, 3.0, 10), Some(1.0));
        assert!(bisect(|_| f64::NAN, 0.0, 1.0, 10).is_none());
    }

    #[test]
    fn bisect_needs_sign_change() {
        assert!(bisect(|x| x * x + 1.0, -1.0, 1.0, 50).is_none());
        assert!(bisect(|x| x, 1.0, f64::INFINITY, 50).is_none());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn bisect_finds_linear_root(root in -50.0_f64..50.0, slope in 0.1_f64..10.0) {
            let found = bisect(|x| slope * (x - root), -100.0, 100.0, 200).unwrap();
            prop_assert!((found - root).abs() < 1e-8, "found {found}, expected {root}");
        }
    }
}
