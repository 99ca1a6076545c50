//! Grid sub-region consistent with one trial.

use std::ops::Range;

use serde::Serialize;

use crate::domain::{DerivedParameters, GridAxis};

/// Index ranges into the density grid plus the time multiplicity factor `mT`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialWindow {
    pub radius: Range<usize>,
    pub time: Range<usize>,
    pub multiplicity: f64,
}

impl TrialWindow {
    /// Select the window for a trial with the given response time.
    ///
    /// Decision times span `RT - t0 -/+ st/2`. When the lower edge precedes the
    /// response (`RT < t0 + st/2`), the time range starts at sample 0 and `mT`
    /// rescales the average by the ratio of kept samples to nominal samples.
    /// Ranges are clipped to the axes; the lower time index used in `mT` is
    /// not. Index arithmetic saturates, so far off-grid values give an empty
    /// window.
    pub fn select(
        derived: &DerivedParameters,
        response_time: f64,
        radius_axis: &GridAxis,
        time_axis: &GridAxis,
    ) -> Self {
        let radius_start = radius_axis.index_of(derived.radius - derived.radius_half_range);
        let radius_end = radius_axis
            .index_of(derived.radius + derived.radius_half_range)
            .saturating_add(1);

        let decision = response_time - derived.non_decision_time;
        let time_low = time_axis.index_of(decision - derived.non_decision_half_range);
        let time_high = time_axis.index_of(decision + derived.non_decision_half_range);

        let (time_start, multiplicity) = if response_time >= derived.non_decision_upper() {
            (time_low, 1.0)
        } else {
            let kept = time_high.saturating_add(1) as f64;
            let nominal = time_high.saturating_sub(time_low).saturating_add(1) as f64;
            (0, kept / nominal)
        };

        Self {
            radius: clip(radius_start, radius_end, radius_axis.len()),
            time: clip(time_start, time_high.saturating_add(1), time_axis.len()),
            multiplicity,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.radius.len() * self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }
}

fn clip(start: isize, end: isize, len: usize) -> Range<usize> {
    let end = end.clamp(0, len as isize) as usize;
    let start = (start.max(0) as usize).min(end);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelParameters;
    use proptest::prelude::*;

    fn axes() -> (GridAxis, GridAxis) {
        (
            GridAxis::new(0.5, 3.0, 0.1).unwrap(),
            GridAxis::new(0.0, 5.0, 0.01).unwrap(),
        )
    }

    fn derived(raw: [f64; 8]) -> DerivedParameters {
        ModelParameters::from_slice(&raw).unwrap().derived()
    }

    #[test]
    fn point_parameters_select_single_radius_and_time() {
        let (ra, ta) = axes();
        let d = derived([1.5, 0.0, 1.0, 0.0, 0.0, 0.0, 0.2, 0.0]);
        let w = TrialWindow::select(&d, 0.8, &ra, &ta);
        assert_eq!(w.radius, 10..11);
        // 0.8 - 0.2 lands just above 0.6 in binary floating point.
        assert_eq!(w.time, 60..61);
        assert_eq!(w.multiplicity, 1.0);
    }

    #[test]
    fn late_response_keeps_full_time_window() {
        let (ra, ta) = axes();
        let d = derived([1.5, 0.2, 1.0, 0.0, 0.0, 0.0, 0.3, 0.1]);
        let w = TrialWindow::select(&d, 1.0, &ra, &ta);
        // radius 1.35..1.65, decision time 0.65..0.75
        assert_eq!(w.radius, 8..12);
        let decision = 1.0 - 0.3;
        assert_eq!(w.time.start, ta.index_of(decision - 0.05) as usize);
        assert_eq!(w.time.end, ta.index_of(decision + 0.05) as usize + 1);
        assert_eq!(w.multiplicity, 1.0);
    }

    #[test]
    fn early_response_truncates_and_rescales() {
        let (ra, ta) = axes();
        let d = derived([1.5, 0.0, 1.0, 0.0, 0.0, 0.0, 0.3, 0.2]);
        // decision time spans -0.05..0.15: indices -5..=15
        let w = TrialWindow::select(&d, 0.35, &ra, &ta);
        let decision = 0.35 - 0.3;
        let high = ta.index_of(decision + 0.1);
        let low = ta.index_of(decision - 0.1);
        assert_eq!((low, high), (-5, 15));
        assert_eq!(w.time, 0..(high as usize + 1));
        assert_eq!(w.multiplicity, (high + 1) as f64 / (high - low + 1) as f64);
        assert!(w.multiplicity < 1.0);
    }

    #[test]
    fn windows_outside_the_grid_are_empty() {
        let (ra, ta) = axes();
        let d = derived([10.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.2, 0.0]);
        assert!(TrialWindow::select(&d, 0.8, &ra, &ta).is_empty());
    }

    #[test]
    fn huge_radius_or_response_time_gives_empty_window() {
        let (ra, ta) = axes();
        let d = derived([1e300, 0.0, 1.0, 0.0, 0.0, 0.0, 0.2, 0.0]);
        assert!(TrialWindow::select(&d, 0.8, &ra, &ta).is_empty());

        let d = derived([1.5, 0.0, 1.0, 0.0, 0.0, 0.0, 0.2, 0.0]);
        assert!(TrialWindow::select(&d, 1e300, &ra, &ta).is_empty());

        let d = derived([1.5, 0.0, 1.0, 0.0, 0.0, 0.0, 0.2, 1e300]);
        let w = TrialWindow::select(&d, 0.8, &ra, &ta);
        assert!(w.multiplicity.is_finite());
    }

    proptest! {
        #[test]
        fn windows_stay_inside_the_grid(
            a in 0.1f64..4.0,
            sa in 0.0f64..1.0,
            t0 in 0.0f64..1.0,
            st in 0.0f64..0.5,
            rt in 0.01f64..6.0,
        ) {
            let (ra, ta) = axes();
            let d = derived([a, sa, 1.0, 0.0, 0.0, 0.0, t0, st]);
            let w = TrialWindow::select(&d, rt, &ra, &ta);
            prop_assert!(w.radius.start <= w.radius.end);
            prop_assert!(w.radius.end <= ra.len());
            prop_assert!(w.time.start <= w.time.end);
            prop_assert!(w.time.end <= ta.len());
            prop_assert!(w.multiplicity.is_finite());
            prop_assert!(w.multiplicity > 0.0 || w.time.is_empty() || rt >= d.non_decision_upper());
        }
    }
}
