//! Bessel functions `J0`, `J1` and the zeros of `J0` at elevated precision.
//!
//! Evaluation switches between two representations:
//!
//! - the power series, for arguments below a precision-dependent threshold
//!   (extra working bits absorb the cancellation, roughly `x log2(e)`)
//! - Hankel's asymptotic expansion above it, truncated at the first term
//!   below the working resolution
//!
//! Zeros start from McMahon's expansion and are polished with Newton's method
//! on `J0` (using `J0' = -J1`).

use std::cmp::Ordering;

use dashu::base::{AbsOrd, SquareRoot};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::math::precision::{HighPrecision, Precision, Real, demote, with_bits};

const GUARD_BITS: usize = 16;
const MAX_NEWTON_STEPS: usize = 64;

/// Argument above which the Hankel expansion reaches the working resolution.
pub fn asymptotic_threshold(bits: usize) -> f64 {
    (bits + GUARD_BITS) as f64 * std::f64::consts::LN_2 / 2.0 * 1.25 + 4.0
}

/// `(J0(x), J1(x))` for `x >= 0`.
pub fn j0_j1(hp: &HighPrecision, x: &Real) -> (Real, Real) {
    let x_approx = demote(x);
    if x_approx < asymptotic_threshold(hp.bits()) {
        power_series(hp, x, x_approx)
    } else {
        hankel(hp, x)
    }
}

fn power_series(hp: &HighPrecision, x: &Real, x_approx: f64) -> (Real, Real) {
    let bits = hp.bits();
    let extra = (x_approx.abs() * std::f64::consts::LOG2_E).ceil() as usize;
    let wp = bits + GUARD_BITS + extra;
    let x = with_bits(x, wp);
    let eps = with_bits(&hp.one(), wp) >> (bits + GUARD_BITS) as isize;

    // q = -x^2/4
    let q = -(&x * &x) >> 2;
    let mut j0_term = with_bits(&hp.one(), wp);
    let mut j1_term = x.clone() >> 1;
    let mut j0 = j0_term.clone();
    let mut j1 = j1_term.clone();
    let mut m: i64 = 1;
    loop {
        j0_term = j0_term * &q / (m * m);
        j1_term = j1_term * &q / (m * (m + 1));
        let settled = (m as f64) > x_approx / 2.0
            && j0_term.abs_cmp(&eps) == Ordering::Less
            && j1_term.abs_cmp(&eps) == Ordering::Less;
        if settled {
            break;
        }
        j0 += &j0_term;
        j1 += &j1_term;
        m += 1;
    }
    (with_bits(&j0, bits), with_bits(&j1, bits))
}

fn hankel(hp: &HighPrecision, x: &Real) -> (Real, Real) {
    let bits = hp.bits();
    let wp = bits + GUARD_BITS;
    let x = with_bits(x, wp);
    let one = with_bits(&hp.one(), wp);
    let eps = one.clone() >> wp as isize;

    let (p0, q0) = hankel_sums(&x, 0, &one, &eps);
    let (p1, q1) = hankel_sums(&x, 4, &one, &eps);

    let pi = with_bits(hp.pi(), wp);
    let chi = &x - (pi.clone() >> 2);
    let (sin, cos) = hp.sin_cos(&chi);
    let (sin, cos) = (with_bits(&sin, wp), with_bits(&cos, wp));
    let scale = ((one << 1) / (&pi * &x)).sqrt();

    let j0 = &scale * (&p0 * &cos - &q0 * &sin);
    let j1 = scale * (p1 * &sin + q1 * &cos);
    (with_bits(&j0, bits), with_bits(&j1, bits))
}

/// Even (`P`) and odd (`Q`) Hankel sums for `mu = 4 nu^2`.
fn hankel_sums(x: &Real, mu: i64, one: &Real, eps: &Real) -> (Real, Real) {
    let eight_x = x.clone() << 3;
    let mut p = one.clone();
    let mut q = one.clone() - one;
    let mut term = one.clone();
    let mut previous = one.clone();
    let mut k: i64 = 1;
    loop {
        term = term * (mu - (2 * k - 1) * (2 * k - 1)) / k / &eight_x;
        if term.abs_cmp(eps) == Ordering::Less || term.abs_cmp(&previous) == Ordering::Greater {
            break;
        }
        // Signs follow (-1)^floor(k/2).
        let signed = if (k / 2) % 2 == 0 { term.clone() } else { -&term };
        if k % 2 == 0 {
            p += &signed;
        } else {
            q += &signed;
        }
        previous = term.clone();
        k += 1;
    }
    (p, q)
}

/// McMahon's large-`k` expansion of the `k`-th positive zero of `J0`.
pub fn mcmahon_guess(k: usize) -> f64 {
    let beta = (k as f64 - 0.25) * std::f64::consts::PI;
    let b = 8.0 * beta;
    beta + 1.0 / b - 124.0 / (3.0 * b.powi(3)) + 120_928.0 / (15.0 * b.powi(5))
        - 401_743_168.0 / (105.0 * b.powi(7))
}

/// The `k`-th positive zero of `J0` together with `J1` evaluated there.
pub fn j0_zero(hp: &HighPrecision, k: usize) -> Result<(Real, Real), AppError> {
    if k == 0 {
        return Err(AppError::invalid("Bessel zeros are numbered from 1."));
    }
    let guess = mcmahon_guess(k);
    let mut x = hp.lift(guess)?;
    let tolerance_shift = hp.bits().saturating_sub(4) as isize;

    for step_count in 1..=MAX_NEWTON_STEPS {
        let (j0, j1) = j0_j1(hp, &x);
        if j1.repr().is_zero() {
            return Err(AppError::numeric(format!(
                "J1 vanished while refining zero {k} of J0 near {}.",
                demote(&x)
            )));
        }
        let step = j0 / &j1;
        x += &step;
        let tolerance = x.clone() >> tolerance_shift;
        if step.abs_cmp(&tolerance) != Ordering::Greater {
            let root = demote(&x);
            if (root - guess).abs() > 0.5 {
                return Err(AppError::numeric(format!(
                    "Zero {k} of J0 drifted from {guess} to {root}."
                )));
            }
            debug!(k, steps = step_count, root, "refined J0 zero");
            let (_, j1) = j0_j1(hp, &x);
            return Ok((x, j1));
        }
    }

    warn!(k, guess, "Newton iteration for J0 zero did not settle");
    Err(AppError::numeric(format!(
        "Zero {k} of J0 did not converge within {MAX_NEWTON_STEPS} Newton steps."
    )))
}

/// The first `N` zeros of `J0` and `J1` at each, at one working precision.
#[derive(Debug, Clone)]
pub struct SpecialFunctionTable {
    precision: Precision,
    zeros: Vec<Real>,
    j1_at_zeros: Vec<Real>,
}

impl SpecialFunctionTable {
    /// Computes entries `1..=n` in parallel.
    pub fn compute(hp: &HighPrecision, n: usize) -> Result<Self, AppError> {
        if n == 0 {
            return Err(AppError::invalid("Bessel table needs at least one zero."));
        }
        let entries = (1..=n)
            .into_par_iter()
            .map(|k| j0_zero(hp, k))
            .collect::<Result<Vec<_>, AppError>>()?;

        let (zeros, j1_at_zeros): (Vec<Real>, Vec<Real>) = entries.into_iter().unzip();
        if let Some(k) = zeros.windows(2).position(|w| w[0] >= w[1]) {
            return Err(AppError::numeric(format!(
                "J0 zeros are not strictly increasing at index {}.",
                k + 1
            )));
        }

        debug!(
            n,
            digits = hp.precision().digits(),
            last_zero = demote(&zeros[n - 1]),
            "built Bessel table"
        );
        Ok(Self {
            precision: hp.precision(),
            zeros,
            j1_at_zeros,
        })
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn len(&self) -> usize {
        self.zeros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zeros.is_empty()
    }

    /// `j0_k` for `k` in `0..len()` (0-based).
    pub fn zero(&self, k: usize) -> &Real {
        &self.zeros[k]
    }

    /// `J1(j0_k)` for `k` in `0..len()` (0-based).
    pub fn j1_at_zero(&self, k: usize) -> &Real {
        &self.j1_at_zeros[k]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Real, &Real)> {
        self.zeros.iter().zip(self.j1_at_zeros.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn context() -> HighPrecision {
        HighPrecision::new(Precision::from_digits(30).unwrap())
    }

    #[test]
    fn small_argument_values() {
        let hp = context();
        let (j0, j1) = j0_j1(&hp, &hp.lift(1.0).unwrap());
        assert_relative_eq!(demote(&j0), 0.765_197_686_557_966_6, max_relative = 1e-15);
        assert_relative_eq!(demote(&j1), 0.440_050_585_744_933_5, max_relative = 1e-15);
    }

    #[test]
    fn series_and_hankel_agree_at_the_switch() {
        let hp = context();
        let x_approx = asymptotic_threshold(hp.bits()) + 0.5;
        let x = hp.lift(x_approx).unwrap();
        let (s0, s1) = power_series(&hp, &x, x_approx);
        let (h0, h1) = hankel(&hp, &x);
        let tolerance = hp.epsilon() << 12;
        assert_eq!((&s0 - &h0).abs_cmp(&tolerance), Ordering::Less);
        assert_eq!((&s1 - &h1).abs_cmp(&tolerance), Ordering::Less);
    }

    #[test]
    fn mcmahon_is_close_to_known_zeros() {
        assert!((mcmahon_guess(1) - 2.404_825_557_695_773).abs() < 5e-3);
        assert!((mcmahon_guess(10) - 30.634_606_468_431_98).abs() < 1e-7);
    }

    #[test]
    fn leading_zeros_and_j1_values() {
        let hp = context();
        let table = SpecialFunctionTable::compute(&hp, 3).unwrap();
        let expected = [
            (2.404_825_557_695_773, 0.519_147_497_289_466_9),
            (5.520_078_110_286_311, -0.340_264_806_573_272_2),
            (8.653_727_912_911_013, 0.271_452_299_928_381_9),
        ];
        for (k, (zero, j1)) in expected.iter().enumerate() {
            assert_relative_eq!(demote(table.zero(k)), *zero, max_relative = 1e-14);
            assert_relative_eq!(demote(table.j1_at_zero(k)), *j1, max_relative = 1e-9);
        }
    }

    #[test]
    fn zeros_are_roots_at_full_precision() {
        let hp = context();
        let tolerance = hp.epsilon() << 10;
        for k in [1, 10, 200] {
            let (zero, _) = j0_zero(&hp, k).unwrap();
            let (j0, _) = j0_j1(&hp, &zero);
            assert_eq!(j0.abs_cmp(&tolerance), Ordering::Less, "zero {k}");
        }
    }

    #[test]
    fn table_is_strictly_increasing() {
        let hp = context();
        let table = SpecialFunctionTable::compute(&hp, 40).unwrap();
        assert_eq!(table.len(), 40);
        assert_eq!(table.precision(), hp.precision());
        let zeros: Vec<f64> = table.iter().map(|(z, _)| demote(z)).collect();
        assert!(zeros.windows(2).all(|w| w[0] < w[1]));
        assert!(SpecialFunctionTable::compute(&hp, 0).is_err());
    }
}
