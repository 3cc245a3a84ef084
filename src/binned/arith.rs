//! Elementwise arithmetic between distributions and scalars.
//!
//! Distributions of different lengths are aligned first: the shorter one is
//! resampled with the [`stretch_to_value_count`] formula up to the length of
//! the longer one. Results carry the receiver's upper bound.
//!
//! [`stretch_to_value_count`]: BinnedDistribution::stretch_to_value_count

use std::borrow::Cow;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

use super::{stretch, BinnedDistribution};

/// Divisor magnitude at or below which an elementwise division yields `0`.
const ZERO_DIVISOR: f64 = 1e-9;

fn safe_div(x: f64, divisor: f64) -> f64 {
    if divisor.abs() > ZERO_DIVISOR {
        x / divisor
    } else {
        0.0
    }
}

impl BinnedDistribution {
    /// Returns a copy with `op` applied to every bin.
    pub fn map(&self, op: impl Fn(f64) -> f64) -> Self {
        Self::from_vec(self.upper_bound, self.bins.iter().map(|&b| op(b)).collect())
    }

    /// Applies `op` to every bin in place.
    pub fn map_in_place(&mut self, op: impl Fn(f64) -> f64) {
        self.bins_mut().iter_mut().for_each(|b| *b = op(*b));
    }

    /// Combines two distributions bin by bin after aligning their lengths.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_distfit::binned::BinnedDistribution;
    ///
    /// let long = BinnedDistribution::from_values(10.0, &[1.0, 2.0, 3.0, 4.0]);
    /// let short = BinnedDistribution::from_values(10.0, &[2.0, 4.0]);
    /// let sum = short.zip_with(&long, |a, b| a + b);
    /// assert_eq!(sum.bins(), &[3.0, 4.0, 7.0, 8.0]);
    /// ```
    pub fn zip_with(&self, other: &Self, op: impl Fn(f64, f64) -> f64) -> Self {
        let mut result = self.clone();
        result.zip_with_in_place(other, op);
        result
    }

    /// In-place variant of [`zip_with`](Self::zip_with); the receiver grows
    /// to the longer length if needed.
    pub fn zip_with_in_place(&mut self, other: &Self, op: impl Fn(f64, f64) -> f64) {
        let n = self.bins.len();
        let m = other.bins.len();
        if n < m {
            self.stretch_to_value_count(m);
        }
        let rhs: Cow<'_, [f64]> = if m < n {
            Cow::Owned(stretch(&other.bins, n))
        } else {
            Cow::Borrowed(&other.bins)
        };
        for (b, &r) in self.bins_mut().iter_mut().zip(rhs.iter()) {
            *b = op(*b, r);
        }
    }

    // -----------------------------------------------------------------------
    // Scalar operands
    // -----------------------------------------------------------------------

    /// Bin-wise `min(bin, value)`.
    pub fn min_scalar(&self, value: f64) -> Self {
        self.map(|b| b.min(value))
    }

    /// Bin-wise `max(bin, value)`.
    pub fn max_scalar(&self, value: f64) -> Self {
        self.map(|b| b.max(value))
    }

    /// Adds `value` to every bin.
    pub fn add_scalar(&self, value: f64) -> Self {
        self.map(|b| b + value)
    }

    /// Subtracts `value` from every bin.
    pub fn sub_scalar(&self, value: f64) -> Self {
        self.map(|b| b - value)
    }

    /// Multiplies every bin by `value`.
    pub fn multiply_scalar(&self, value: f64) -> Self {
        self.map(|b| b * value)
    }

    /// Divides every bin by `value`.
    ///
    /// Dividing by exactly `0` returns an unchanged copy. Note the contrast
    /// with [`divide`](Self::divide), where a zero divisor bin zeroes the
    /// result bin.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_distfit::binned::BinnedDistribution;
    ///
    /// let dist = BinnedDistribution::from_values(10.0, &[3.0, 4.0]);
    /// assert_eq!(dist.divide_scalar(0.0), dist);
    /// assert_eq!(dist.divide_scalar(2.0).bins(), &[1.5, 2.0]);
    /// ```
    pub fn divide_scalar(&self, value: f64) -> Self {
        if value == 0.0 {
            return self.clone();
        }
        self.map(|b| b / value)
    }

    // -----------------------------------------------------------------------
    // Distribution operands
    // -----------------------------------------------------------------------

    /// Bin-wise minimum.
    pub fn min(&self, other: &Self) -> Self {
        self.zip_with(other, f64::min)
    }

    /// Bin-wise maximum.
    pub fn max(&self, other: &Self) -> Self {
        self.zip_with(other, f64::max)
    }

    /// Bin-wise sum.
    pub fn add(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a + b)
    }

    /// Bin-wise difference.
    pub fn sub(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a - b)
    }

    /// Bin-wise product.
    pub fn multiply(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a * b)
    }

    /// Bin-wise quotient with `x / 0 := 0`.
    ///
    /// `dist.divide(&dist)` is `1` where the original bin is non-zero and
    /// `0` elsewhere.
    pub fn divide(&self, other: &Self) -> Self {
        self.zip_with(other, safe_div)
    }

    /// In-place [`min`](Self::min).
    pub fn min_to_this(&mut self, other: &Self) {
        self.zip_with_in_place(other, f64::min);
    }

    /// In-place [`max`](Self::max).
    pub fn max_to_this(&mut self, other: &Self) {
        self.zip_with_in_place(other, f64::max);
    }

    /// In-place [`add`](Self::add).
    pub fn add_to_this(&mut self, other: &Self) {
        self.zip_with_in_place(other, |a, b| a + b);
    }

    /// In-place [`sub`](Self::sub).
    pub fn sub_to_this(&mut self, other: &Self) {
        self.zip_with_in_place(other, |a, b| a - b);
    }

    /// In-place [`multiply`](Self::multiply).
    pub fn multiply_to_this(&mut self, other: &Self) {
        self.zip_with_in_place(other, |a, b| a * b);
    }

    /// In-place [`divide`](Self::divide).
    pub fn divide_to_this(&mut self, other: &Self) {
        self.zip_with_in_place(other, safe_div);
    }

    // -----------------------------------------------------------------------
    // Rounding
    // -----------------------------------------------------------------------

    /// Rounds every bin half away from zero.
    pub fn round(&self) -> Self {
        self.map(f64::round)
    }

    /// Rounds every bin down.
    pub fn floor(&self) -> Self {
        self.map(f64::floor)
    }

    /// Rounds every bin up.
    pub fn ceil(&self) -> Self {
        self.map(f64::ceil)
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $dist_fn:ident, $scalar_fn:ident, $in_place_fn:ident) => {
        impl $trait<&BinnedDistribution> for &BinnedDistribution {
            type Output = BinnedDistribution;

            fn $method(self, rhs: &BinnedDistribution) -> BinnedDistribution {
                BinnedDistribution::$dist_fn(self, rhs)
            }
        }

        impl $trait<f64> for &BinnedDistribution {
            type Output = BinnedDistribution;

            fn $method(self, rhs: f64) -> BinnedDistribution {
                self.$scalar_fn(rhs)
            }
        }

        impl $assign_trait<&BinnedDistribution> for BinnedDistribution {
            fn $assign_method(&mut self, rhs: &BinnedDistribution) {
                self.$in_place_fn(rhs);
            }
        }
    };
}

impl_binary_op!(Add, add, AddAssign, add_assign, add, add_scalar, add_to_this);
impl_binary_op!(Sub, sub, SubAssign, sub_assign, sub, sub_scalar, sub_to_this);
impl_binary_op!(Mul, mul, MulAssign, mul_assign, multiply, multiply_scalar, multiply_to_this);
impl_binary_op!(Div, div, DivAssign, div_assign, divide, divide_scalar, divide_to_this);


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn add_is_commutative_across_lengths(
            a in proptest::collection::vec(-50.0_f64..50.0, 1..=12),
            factor in 1_usize..=4,
        ) {
            let long: Vec<f64> = (0..a.len() * factor).map(|i| i as f64).collect();
            let da = BinnedDistribution::from_values(10.0, &a);
            let dl = BinnedDistribution::from_values(10.0, &long);
            let x = da.add(&dl);
            let y = dl.add(&da);
            prop_assert_eq!(x.bins(), y.bins());
            prop_assert_eq!(x.len(), long.len());
        }

        #[test]
        fn divide_never_produces_non_finite(
            a in proptest::collection::vec(-50.0_f64..50.0, 1..=12),
            b in proptest::collection::vec(-1.0_f64..1.0, 1..=12),
        ) {
            let da = BinnedDistribution::from_values(10.0, &a);
            let db = BinnedDistribution::from_values(10.0, &b).map(|v| if v.abs() < 0.5 { 0.0 } else { v });
            let q = da.divide(&db);
            prop_assert!(q.bins().iter().all(|v| v.is_finite()));
        }
    }
}
