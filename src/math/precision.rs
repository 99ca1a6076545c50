//! Elevated-precision arithmetic context.
//!
//! The first-passage series and the Bessel table are evaluated with binary
//! big floats (`dashu`). The library supplies the field operations, `ln` and
//! `exp`; the kernels the series calls once per term are implemented here:
//!
//! - `exp_neg`: `exp(-y)` for `y >= 0`. Reuses one `ln 2` per context instead
//!   of recomputing it per call, which makes it about 3x faster than
//!   `FBig::exp` at 30 digits
//! - `sin_cos`: argument-reduced Taylor series with angle doubling
//! - `pi`: Machin's formula, computed once per context
//!
//! A `HighPrecision` is immutable after construction and shared across rayon
//! workers by reference.

use std::cmp::Ordering;

use dashu::base::{AbsOrd, Sign};
use dashu::float::FBig;
use dashu::float::round::mode::HalfEven;

use crate::error::AppError;

/// Binary big float used for every elevated-precision quantity.
pub type Real = FBig<HalfEven, 2>;

const LOG2_10: f64 = 3.321_928_094_887_362_6;

/// Guard bits for constants that are reused in many operations.
const CONSTANT_GUARD_BITS: usize = 64;

const EXP_GUARD_BITS: usize = 24;
const EXP_HALVINGS: isize = 8;
/// `exp(-y)` for `y / ln 2` beyond this is reported as exactly zero.
const MAX_EXP_SHIFT: isize = 1 << 20;

const TRIG_GUARD_BITS: usize = 32;
const TRIG_HALVINGS: isize = 8;

/// Working precision, stated in decimal digits and held in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision {
    digits: u32,
    bits: usize,
}

impl Precision {
    /// `bits = round((digits + 1) * log2(10))`.
    pub fn from_digits(digits: u32) -> Result<Self, AppError> {
        if digits == 0 {
            return Err(AppError::invalid("Decimal precision must be >= 1 digit."));
        }
        let bits = ((digits as f64 + 1.0) * LOG2_10).round() as usize;
        Ok(Self { digits, bits })
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    pub fn bits(&self) -> usize {
        self.bits
    }
}

/// Constants and kernels at one fixed working precision.
#[derive(Debug, Clone)]
pub struct HighPrecision {
    precision: Precision,
    one: Real,
    pi: Real,
    pi_wide: Real,
    ln2_wide: Real,
}

impl HighPrecision {
    pub fn new(precision: Precision) -> Self {
        let bits = precision.bits();
        let wide = bits + CONSTANT_GUARD_BITS;
        let pi_wide = machin_pi(wide);
        let ln2_wide = (unit(wide) * 2i64).ln();
        Self {
            precision,
            one: unit(bits),
            pi: with_bits(&pi_wide, bits),
            pi_wide,
            ln2_wide,
        }
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn bits(&self) -> usize {
        self.precision.bits
    }

    pub fn one(&self) -> Real {
        self.one.clone()
    }

    pub fn zero(&self) -> Real {
        with_bits(&Real::ZERO, self.bits())
    }

    pub fn pi(&self) -> &Real {
        &self.pi
    }

    /// Exact image of a finite `f64` at working precision.
    pub fn lift(&self, x: f64) -> Result<Real, AppError> {
        if !x.is_finite() {
            return Err(AppError::invalid(format!(
                "Cannot lift non-finite value {x} to elevated precision."
            )));
        }
        let value = Real::try_from(x).map_err(|_| {
            AppError::invalid(format!("Cannot lift {x} to elevated precision."))
        })?;
        Ok(with_bits(&value, self.bits()))
    }

    /// `2^-bits`, the relative resolution of the context.
    pub fn epsilon(&self) -> Real {
        self.one() >> self.bits() as isize
    }

    /// `exp(-y)` for `y >= 0`.
    ///
    /// `y = s ln2 + r` with `0 <= r < ln2`; `exp(-r)` comes from a Taylor series
    /// on `-r / 2^8` followed by eight squarings, then the result is shifted
    /// down by `s` bits. Negative `y` is treated as `|y|`.
    pub fn exp_neg(&self, y: &Real) -> Real {
        if y.repr().is_zero() {
            return self.one();
        }
        let bits = self.bits();
        let wp = bits + EXP_GUARD_BITS;
        let y = match y.sign() {
            Sign::Positive => with_bits(y, wp),
            Sign::Negative => with_bits(&-y, wp),
        };

        let s = (&y / &self.ln2_wide).floor();
        let shift = match isize::try_from(s.to_int().value()) {
            Ok(shift) if shift <= MAX_EXP_SHIFT => shift,
            _ => return self.zero(),
        };
        let r = &y - s * &self.ln2_wide;
        let x = -(r >> EXP_HALVINGS);

        let eps = unit(wp) >> wp as isize;
        let mut sum = unit(wp);
        let mut term = unit(wp);
        let mut k: i64 = 1;
        loop {
            term = term * &x / k;
            if term.abs_cmp(&eps) == Ordering::Less {
                break;
            }
            sum += &term;
            k += 1;
        }
        for _ in 0..EXP_HALVINGS {
            sum = sum.sqr();
        }
        with_bits(&(sum >> shift), bits)
    }

    /// `(sin x, cos x)` at working precision.
    pub fn sin_cos(&self, x: &Real) -> (Real, Real) {
        let bits = self.bits();
        let wp = bits + TRIG_GUARD_BITS;
        let x = with_bits(x, wp);

        let two_pi = self.pi_wide.clone() << 1;
        let n = (&x / &two_pi).round();
        let r = x - n * &two_pi;
        let h = with_bits(&r, wp) >> TRIG_HALVINGS;
        let h2 = &h * &h;

        let eps = unit(wp) >> wp as isize;
        let mut sin = h.clone();
        let mut cos = unit(wp);
        let mut sin_term = h;
        let mut cos_term = unit(wp);
        let mut k: i64 = 1;
        loop {
            cos_term = -(cos_term * &h2) / ((2 * k - 1) * (2 * k));
            sin_term = -(sin_term * &h2) / ((2 * k) * (2 * k + 1));
            if cos_term.abs_cmp(&eps) == Ordering::Less && sin_term.abs_cmp(&eps) == Ordering::Less
            {
                break;
            }
            cos += &cos_term;
            sin += &sin_term;
            k += 1;
        }

        for _ in 0..TRIG_HALVINGS {
            let doubled = (&sin * &cos) << 1;
            cos = (&cos - &sin) * (&cos + &sin);
            sin = doubled;
        }
        (with_bits(&sin, bits), with_bits(&cos, bits))
    }
}

/// Nearest `f64` (ties to even). Values below the `f64` range become `0.0`.
pub fn demote(x: &Real) -> f64 {
    x.to_f64().value()
}

/// `x` re-rounded to `bits` of precision (or widened to it).
pub fn with_bits(x: &Real, bits: usize) -> Real {
    x.clone().with_precision(bits).value()
}

fn unit(bits: usize) -> Real {
    with_bits(&Real::ONE, bits)
}

/// `pi = 16 atan(1/5) - 4 atan(1/239)`.
fn machin_pi(bits: usize) -> Real {
    let wp = bits + 16;
    let pi = arctan_inverse(5, wp) * 16i64 - arctan_inverse(239, wp) * 4i64;
    with_bits(&pi, bits)
}

/// `atan(1/n)` by its alternating Maclaurin series.
fn arctan_inverse(n: i64, bits: usize) -> Real {
    let x = unit(bits) / n;
    let x2 = &x * &x;
    let eps = unit(bits) >> bits as isize;
    let mut sum = x.clone();
    let mut power = x;
    let mut k: i64 = 1;
    loop {
        power = -(power * &x2);
        let term = &power / (2 * k + 1);
        if term.abs_cmp(&eps) == Ordering::Less {
            break;
        }
        sum += &term;
        k += 1;
    }
    sum
}
