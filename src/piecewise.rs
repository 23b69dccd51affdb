//! Piecewise-linear hydro production functions.
//!
//! A reservoir's production function maps turbined flow to hydro power and is given as a table of
//! breakpoints sorted by flow. Values between breakpoints are linearly interpolated and values
//! outside the table are clamped to the first or last breakpoint.
use crate::case::Breakpoint;
use anyhow::{Result, ensure};

/// A piecewise-linear function borrowing its breakpoint table from the case data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiecewiseFunction<'a> {
    breakpoints: &'a [Breakpoint],
}

impl<'a> PiecewiseFunction<'a> {
    /// Create a new [`PiecewiseFunction`], checking that the table is usable.
    ///
    /// The table must have at least one breakpoint and flows must be in ascending order. Repeated
    /// flow values are accepted and treated as a zero-width segment.
    pub fn new(breakpoints: &'a [Breakpoint]) -> Result<Self> {
        ensure!(!breakpoints.is_empty(), "Breakpoint table is empty");
        ensure!(
            breakpoints.iter().all(|pt| pt.flow.is_finite() && pt.power.is_finite()),
            "Breakpoint table contains non-finite values"
        );
        ensure!(
            breakpoints.windows(2).all(|w| w[0].flow <= w[1].flow),
            "Breakpoints must be sorted by ascending flow"
        );

        Ok(Self { breakpoints })
    }

    /// The breakpoints of the function
    pub fn breakpoints(&self) -> &'a [Breakpoint] {
        self.breakpoints
    }

    /// Evaluate the function at the given flow.
    ///
    /// Flows below the first breakpoint give the first breakpoint's power and flows above the last
    /// give the last breakpoint's power.
    pub fn interpolate(&self, flow: f64) -> f64 {
        let pts = self.breakpoints;
        let first = &pts[0];
        let last = &pts[pts.len() - 1];
        if flow <= first.flow {
            return first.power;
        }
        if flow >= last.flow {
            return last.power;
        }

        // Index of the first breakpoint at or above `flow`. NB: this is always in 1..len because
        // of the clamping above.
        let idx = pts.partition_point(|pt| pt.flow < flow);
        let (lo, hi) = (&pts[idx - 1], &pts[idx]);
        let span = hi.flow - lo.flow;
        let fraction = if span > 0.0 {
            (flow - lo.flow) / span
        } else {
            0.0
        };

        lo.power + fraction * (hi.power - lo.power)
    }

    /// The function's value at each of its breakpoints
    pub fn breakpoint_powers(&self) -> impl Iterator<Item = f64> + '_ {
        self.breakpoints.iter().map(|pt| self.interpolate(pt.flow))
    }

    /// Number of linear segments in the table
    pub fn num_segments(&self) -> usize {
        self.breakpoints.len() - 1
    }
}
