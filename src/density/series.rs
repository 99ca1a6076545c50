//! Truncated Bessel series for the first-passage time density at one cell.
//!
//! `P(a, t) = 1 / (2 pi a^2) * sum_k (j_k / J1(j_k)) exp(-j_k^2 t / (2 a^2))`
//!
//! Summation stops once `|term / running_sum| < r` or after `N` terms.

use std::cmp::Ordering;

use dashu::base::{AbsOrd, Sign};

use crate::math::precision::{HighPrecision, Real, demote};
use crate::math::SpecialFunctionTable;

/// Per-term constants shared by every cell of a grid.
#[derive(Debug, Clone)]
pub struct SeriesCoefficients {
    /// `j_k / J1(j_k)`
    weights: Vec<Real>,
    /// `j_k^2`
    decay: Vec<Real>,
}

impl SeriesCoefficients {
    /// Coefficients for the first `max_terms` entries of `table`.
    pub fn from_table(table: &SpecialFunctionTable, max_terms: usize) -> Self {
        let (weights, decay) = table
            .iter()
            .take(max_terms)
            .map(|(zero, j1)| (zero / j1, zero * zero))
            .unzip();
        Self { weights, decay }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Result of evaluating the series at one `(a, t)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellOutcome {
    pub density: f64,
    pub terms_used: usize,
    /// The relative-tolerance exit fired before the term cap.
    pub converged: bool,
    /// The elevated-precision value was negative and has been set to 0.
    pub clamped: bool,
}

/// Evaluate the truncated series at `(radius, time)`.
pub fn first_passage_density(
    hp: &HighPrecision,
    coefficients: &SeriesCoefficients,
    radius: &Real,
    time: &Real,
    tolerance: &Real,
) -> CellOutcome {
    let radius_sq = radius * radius;
    let scale = time / (&radius_sq * 2i64);

    let mut sum = hp.zero();
    let mut terms_used = 0;
    let mut converged = false;
    for (weight, decay) in coefficients.weights.iter().zip(&coefficients.decay) {
        let term = weight * hp.exp_neg(&(decay * &scale));
        terms_used += 1;
        if term.repr().is_zero() {
            // Later terms decay faster still.
            converged = true;
            break;
        }
        sum += &term;
        if term.abs_cmp(&(tolerance * &sum)) == Ordering::Less {
            converged = true;
            break;
        }
    }

    let density = sum / &radius_sq / 2i64 / hp.pi();
    let clamped = density.sign() == Sign::Negative && !density.repr().is_zero();
    CellOutcome {
        density: if clamped { 0.0 } else { demote(&density) },
        terms_used,
        converged,
        clamped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::precision::Precision;

    fn setup(terms: usize) -> (HighPrecision, SeriesCoefficients) {
        let hp = HighPrecision::new(Precision::from_digits(30).unwrap());
        let table = SpecialFunctionTable::compute(&hp, terms).unwrap();
        let coefficients = SeriesCoefficients::from_table(&table, terms);
        (hp, coefficients)
    }

    fn eval(hp: &HighPrecision, c: &SeriesCoefficients, a: f64, t: f64, r: f64) -> CellOutcome {
        first_passage_density(
            hp,
            c,
            &hp.lift(a).unwrap(),
            &hp.lift(t).unwrap(),
            &hp.lift(r).unwrap(),
        )
    }

    #[test]
    fn late_times_need_only_the_leading_term() {
        let (hp, c) = setup(20);
        let out = eval(&hp, &c, 1.0, 5.0, 1e-30);
        assert!(out.converged);
        assert!(out.terms_used < 5);

        // Leading term alone: j1/J1(j1) * exp(-j1^2 t / 2) / (2 pi).
        let j = 2.404_825_557_695_773_f64;
        let lead = j / 0.519_147_497_289_466_9 * (-j * j * 5.0 / 2.0).exp() / (2.0 * std::f64::consts::PI);
        assert!((out.density - lead).abs() <= 1e-12 * lead);
    }

    #[test]
    fn early_times_exhaust_the_term_cap() {
        let (hp, c) = setup(10);
        let out = eval(&hp, &c, 1.5, 0.01, 1e-30);
        assert_eq!(out.terms_used, 10);
        assert!(!out.converged);
    }

    #[test]
    fn density_is_finite_and_non_negative() {
        let (hp, c) = setup(50);
        for a in [0.5, 1.0, 2.5] {
            for t in [0.0, 0.01, 0.2, 1.0, 4.99] {
                let out = eval(&hp, &c, a, t, 1e-30);
                assert!(out.density.is_finite());
                assert!(out.density >= 0.0, "a={a} t={t} -> {}", out.density);
            }
        }
    }

    #[test]
    fn partial_sums_settle_as_terms_grow() {
        let (hp, c10) = setup(10);
        let (_, c40) = setup(40);
        let (_, c80) = setup(80);
        let d10 = eval(&hp, &c10, 1.0, 0.05, 1e-30).density;
        let d40 = eval(&hp, &c40, 1.0, 0.05, 1e-30).density;
        let d80 = eval(&hp, &c80, 1.0, 0.05, 1e-30).density;
        assert!((d80 - d40).abs() <= (d40 - d10).abs());
    }

    #[test]
    fn converged_cells_are_stable_under_a_larger_term_cap() {
        let r = 1e-30;
        let (hp, small) = setup(20);
        let (_, large) = setup(120);
        let mut converged_cells = 0;
        for a in [0.5, 1.0, 2.0, 2.9] {
            for t in [0.01, 0.05, 0.2, 1.0, 3.0] {
                let before = eval(&hp, &small, a, t, r);
                if !before.converged {
                    continue;
                }
                converged_cells += 1;
                let after = eval(&hp, &large, a, t, r);
                assert!(
                    (after.density - before.density).abs() <= r * before.density,
                    "a={a} t={t}: {} -> {}",
                    before.density,
                    after.density
                );
            }
        }
        assert!(converged_cells > 0);
    }
}
