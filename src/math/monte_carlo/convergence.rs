//! Empirical convergence tracking against the known analytic value.
//!
//! After each cycle the relative error of the running estimate is recorded on a log-log scale,
//! `(log10 n, log10 |I_n - I| / |I|)`. For plain Monte Carlo the points scatter around a line of
//! slope -1/2.

use log::warn;

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Value recorded when the relative error is below `f64::EPSILON`, including exactly zero.
pub const DEGENERATE_LOG_ERROR: f64 = -15.653559774527022;

/// `log10(|estimate - analytic| / |analytic|)`, clamped below at [`DEGENERATE_LOG_ERROR`].
///
/// `log10(0)` has no finite value, and a relative error under machine epsilon carries no
/// information, so both map to `log10(f64::EPSILON)`. The result is finite for finite inputs
/// with a nonzero `analytic`.
pub fn log_relative_error(estimate: f64, analytic: f64) -> f64 {
    if is_degenerate(estimate, analytic) {
        return DEGENERATE_LOG_ERROR;
    }
    ((estimate - analytic).abs() / analytic.abs()).log10()
}

/// True when [`log_relative_error`] clamps.
pub fn is_degenerate(estimate: f64, analytic: f64) -> bool {
    (estimate - analytic).abs() / analytic.abs() < f64::EPSILON
}

/// One point of the error series.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ErrorSample {
    /// `log10(total_guesses)`
    pub log_sample_count: f64,
    pub log_abs_rel_error: f64,
    /// The error was clamped to [`DEGENERATE_LOG_ERROR`].
    pub degenerate: bool,
}

impl ErrorSample {
    /// `(x, y)` pair for plotting.
    pub fn as_xy(&self) -> (f64, f64) {
        (self.log_sample_count, self.log_abs_rel_error)
    }
}

/// Append-only series of [`ErrorSample`]s, one per completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceTracker {
    analytic_answer: f64,
    series: Vec<ErrorSample>,
}

impl ConvergenceTracker {
    pub fn new(analytic_answer: f64) -> Result<Self> {
        if !analytic_answer.is_finite() || analytic_answer == 0.0 {
            return Err(Error::InvalidConfig(format!(
                "analytic answer must be finite and nonzero, got {analytic_answer}"
            )));
        }
        Ok(Self {
            analytic_answer,
            series: Vec::new(),
        })
    }

    /// Computes the sample for `estimate` after `total_guesses` samples without recording it.
    pub fn sample_for(&self, estimate: f64, total_guesses: u64) -> Result<ErrorSample> {
        if total_guesses == 0 {
            return Err(Error::UninitializedAccumulator);
        }
        let degenerate = is_degenerate(estimate, self.analytic_answer);
        if degenerate {
            warn!(
                "estimate {estimate} matches analytic answer within epsilon after {total_guesses} samples, \
                 clamping log error to {DEGENERATE_LOG_ERROR}"
            );
        }
        Ok(ErrorSample {
            log_sample_count: (total_guesses as f64).log10(),
            log_abs_rel_error: log_relative_error(estimate, self.analytic_answer),
            degenerate,
        })
    }

    pub fn push(&mut self, sample: ErrorSample) {
        self.series.push(sample);
    }

    /// Computes the log error of `estimate`, appends it to the series and returns it.
    pub fn record_and_compute_error(&mut self, estimate: f64, total_guesses: u64) -> Result<f64> {
        let sample = self.sample_for(estimate, total_guesses)?;
        self.push(sample);
        Ok(sample.log_abs_rel_error)
    }

    pub fn series(&self) -> &[ErrorSample] {
        &self.series
    }

    pub fn last(&self) -> Option<&ErrorSample> {
        self.series.last()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }

    pub fn analytic_answer(&self) -> f64 {
        self.analytic_answer
    }

    /// Least-squares slope of log error against log sample count.
    ///
    /// Degenerate samples are skipped. Returns `None` with fewer than two usable samples or when
    /// all of them share the same sample count.
    pub fn fitted_slope(&self) -> Option<f64> {
        let points: Vec<(f64, f64)> = self
            .series
            .iter()
            .filter(|s| !s.degenerate)
            .map(ErrorSample::as_xy)
            .collect();
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
        let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
        if sxx == 0.0 {
            return None;
        }
        let sxy: f64 = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();
        Some(sxy / sxx)
    }
}
