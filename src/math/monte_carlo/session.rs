//! Cycle orchestration: sample, merge, track error, buffer points.
//!
//! An [`IntegrationSession`] owns all cross-cycle state. It is `Sync`, so it can be shared with
//! a worker thread while another thread reads progress, but at most one cycle runs at a time: a
//! second [`run_cycle`](IntegrationSession::run_cycle) or a [`reset`](IntegrationSession::reset)
//! issued during a cycle fails with [`Error::SessionBusy`].
//!
//! A cycle has two phases. Sampling works only on the generator and on staging values; readers
//! such as [`state`](IntegrationSession::state) keep seeing the previous cycle's results while it
//! runs. The merge then commits the new totals, the error sample and the buffered points under a
//! single lock, after every fallible step has succeeded, so a cycle is either fully applied or
//! not applied at all.
//!
//! # Example
//!
//! ```rust
//! use mccycle::math::monte_carlo::{IntegrationSession, SessionConfig};
//!
//! let session = IntegrationSession::new(SessionConfig::default().with_seed(42)).unwrap();
//! for _ in 0..5 {
//!     let report = session.run_cycle(20_000).unwrap();
//!     println!("{} {} {}", report.total_guesses, report.estimate, report.log_error);
//! }
//! assert_eq!(session.state().total_guesses, 100_000);
//! assert_eq!(session.error_series().len(), 5);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::error::{Error, Result};

use super::classifier::PointClassifier;
use super::convergence::{ConvergenceTracker, ErrorSample};
use super::integrand::{BoundingBox, ExpMinusX};
use super::monte_carlo_integration::{CycleTally, IntegrationAccumulator, IntegrationState};
use super::point_buffer::{PointBuffer, PointsSnapshot, StagedPoints};
use super::sampler::RandomPointSampler;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default cap on each buffered point sequence.
pub const DEFAULT_POINT_BUFFER_CAP: usize = 750_000;
/// Default cumulative sample count past which the point buffer stops growing.
pub const DEFAULT_DENSE_POINT_THRESHOLD: u64 = 500_000;
/// Default sample count for [`IntegrationSession::run_default_cycle`].
pub const DEFAULT_CYCLE_SAMPLES: u64 = 23_458;

/// Construction-time settings of a session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionConfig {
    /// Exact value of the integral, used only for the error series.
    pub analytic_answer: f64,
    /// Maximum length of each of the inside/outside point sequences.
    pub point_buffer_cap: usize,
    /// Cumulative samples after which new points are no longer buffered.
    pub dense_point_threshold: u64,
    /// Sample count used by [`IntegrationSession::run_default_cycle`].
    pub default_cycle_samples: u64,
    /// Seed for the sampling generator; `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Tally unbuffered cycles on the rayon pool. Needs the `parallel` feature.
    pub parallel: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            analytic_answer: ExpMinusX.analytic_integral(),
            point_buffer_cap: DEFAULT_POINT_BUFFER_CAP,
            dense_point_threshold: DEFAULT_DENSE_POINT_THRESHOLD,
            default_cycle_samples: DEFAULT_CYCLE_SAMPLES,
            seed: None,
            parallel: false,
        }
    }
}

impl SessionConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_point_buffer_cap(mut self, cap: usize) -> Self {
        self.point_buffer_cap = cap;
        self
    }

    pub fn with_dense_point_threshold(mut self, threshold: u64) -> Self {
        self.dense_point_threshold = threshold;
        self
    }

    pub fn with_default_cycle_samples(mut self, samples: u64) -> Self {
        self.default_cycle_samples = samples;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.analytic_answer.is_finite() || self.analytic_answer == 0.0 {
            return Err(Error::InvalidConfig(format!(
                "analytic_answer must be finite and nonzero, got {}",
                self.analytic_answer
            )));
        }
        if self.default_cycle_samples == 0 {
            return Err(Error::InvalidConfig(
                "default_cycle_samples must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a caller needs to display after a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Cumulative integral estimate.
    pub estimate: f64,
    /// `log10` of the relative error of `estimate`.
    pub log_error: f64,
    /// Cumulative sample count.
    pub total_guesses: u64,
    pub cycle_inside: u64,
    pub cycle_total: u64,
    /// Whether this cycle's points went into the buffer.
    pub points_recorded: bool,
    pub points: PointsSnapshot,
}

struct SessionCore {
    state: IntegrationState,
    tracker: ConvergenceTracker,
    buffer: PointBuffer,
}

/// Clears the busy flag when dropped, including on unwind.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| Self(flag))
            .map_err(|_| Error::SessionBusy)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Incremental Monte Carlo integration of `exp(-x)` over `[0, 1]`.
pub struct IntegrationSession<R = ChaCha20Rng> {
    config: SessionConfig,
    integrand: ExpMinusX,
    bbox: BoundingBox,
    accumulator: IntegrationAccumulator,
    busy: AtomicBool,
    sampler: Mutex<RandomPointSampler<R>>,
    core: Mutex<SessionCore>,
}

impl IntegrationSession<ChaCha20Rng> {
    /// Creates a session sampling from `ChaCha20Rng`, seeded from `config.seed` when given.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> IntegrationSession<R> {
    /// Creates a session drawing from `rng`. `config.seed` is ignored.
    pub fn with_rng(config: SessionConfig, rng: R) -> Result<Self> {
        config.validate()?;
        if config.parallel && !cfg!(feature = "parallel") {
            warn!("parallel tallying requested but the `parallel` feature is disabled, running sequentially");
        }

        let integrand = ExpMinusX;
        let bbox = integrand.bounding_box();
        let core = SessionCore {
            state: IntegrationState::default(),
            tracker: ConvergenceTracker::new(config.analytic_answer)?,
            buffer: PointBuffer::new(config.point_buffer_cap),
        };
        info!(
            "integration session created: analytic answer {}, point cap {}, dense threshold {}",
            config.analytic_answer, config.point_buffer_cap, config.dense_point_threshold
        );

        Ok(Self {
            accumulator: IntegrationAccumulator::new(PointClassifier::new(integrand)),
            integrand,
            bbox,
            busy: AtomicBool::new(false),
            sampler: Mutex::new(RandomPointSampler::new(rng, bbox)?),
            core: Mutex::new(core),
            config,
        })
    }

    /// Runs one cycle of `sample_count` samples and merges it into the session.
    pub fn run_cycle(&self, sample_count: u64) -> Result<CycleReport> {
        let _busy = BusyGuard::acquire(&self.busy).map_err(|err| {
            warn!("rejected cycle of {sample_count} samples: another cycle is running");
            err
        })?;
        if sample_count == 0 {
            return Err(Error::InvalidSampleCount(sample_count));
        }

        // Only the busy holder mutates the core, so this copy stays current until the merge.
        let (mut state, record_points, mut staged) = {
            let core = self.lock_core();
            let record_points =
                PointBuffer::accepts_cycle(&core.state, self.config.dense_point_threshold);
            let staged = if record_points {
                core.buffer.stage()
            } else {
                StagedPoints::closed()
            };
            (core.state, record_points, staged)
        };

        let tally = self.tally(sample_count, record_points, &mut staged)?;

        state.merge(tally);
        let estimate = IntegrationAccumulator::current_estimate(&state, self.bbox.area())?;

        let mut core = self.lock_core();
        let sample = core.tracker.sample_for(estimate, state.total_guesses)?;
        if record_points {
            core.buffer.commit(staged);
        }
        state.is_first_cycle = false;
        core.state = state;
        core.tracker.push(sample);

        debug!(
            "cycle of {} samples merged: {} inside, total {}, estimate {}, log error {}",
            tally.total,
            tally.inside,
            state.total_guesses,
            estimate,
            sample.log_abs_rel_error
        );

        Ok(CycleReport {
            estimate,
            log_error: sample.log_abs_rel_error,
            total_guesses: state.total_guesses,
            cycle_inside: tally.inside,
            cycle_total: tally.total,
            points_recorded: record_points,
            points: core.buffer.snapshot(),
        })
    }

    /// Runs a cycle of `config.default_cycle_samples` samples.
    pub fn run_default_cycle(&self) -> Result<CycleReport> {
        self.run_cycle(self.config.default_cycle_samples)
    }

    fn tally(
        &self,
        sample_count: u64,
        record_points: bool,
        staged: &mut StagedPoints,
    ) -> Result<CycleTally> {
        let mut sampler = self
            .sampler
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if record_points {
            self.accumulator
                .run_cycle_with(&mut *sampler, sample_count, |point, inside| {
                    staged.push(point, inside)
                })
        } else if self.config.parallel {
            self.par_tally(&mut sampler, sample_count)
        } else {
            self.accumulator.run_cycle(&mut *sampler, sample_count)
        }
    }

    #[cfg(feature = "parallel")]
    fn par_tally(
        &self,
        sampler: &mut RandomPointSampler<R>,
        sample_count: u64,
    ) -> Result<CycleTally> {
        let cycle_seed: u64 = sampler.rng_mut().gen();
        self.accumulator
            .par_run_cycle(self.bbox, cycle_seed, sample_count)
    }

    #[cfg(not(feature = "parallel"))]
    fn par_tally(
        &self,
        sampler: &mut RandomPointSampler<R>,
        sample_count: u64,
    ) -> Result<CycleTally> {
        self.accumulator.run_cycle(sampler, sample_count)
    }

    /// Clears totals, error series and buffered points together.
    pub fn reset(&self) -> Result<()> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        let mut core = self.lock_core();
        core.state = IntegrationState::default();
        core.tracker.clear();
        core.buffer.clear();
        info!("integration session reset");
        Ok(())
    }

    fn lock_core(&self) -> MutexGuard<'_, SessionCore> {
        // State is only written after all fallible steps, so a poisoned lock still holds a
        // consistent value.
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> IntegrationState {
        self.lock_core().state
    }

    pub fn error_series(&self) -> Vec<ErrorSample> {
        self.lock_core().tracker.series().to_vec()
    }

    pub fn points(&self) -> PointsSnapshot {
        self.lock_core().buffer.snapshot()
    }

    /// Estimate from the merged totals; fails before the first cycle.
    pub fn current_estimate(&self) -> Result<f64> {
        IntegrationAccumulator::current_estimate(&self.lock_core().state, self.bbox.area())
    }

    /// Slope of the error series on the log-log scale, see
    /// [`ConvergenceTracker::fitted_slope`].
    pub fn convergence_slope(&self) -> Option<f64> {
        self.lock_core().tracker.fitted_slope()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn integrand(&self) -> ExpMinusX {
        self.integrand
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn seeded(seed: u64) -> IntegrationSession {
        IntegrationSession::new(SessionConfig::default().with_seed(seed)).unwrap()
    }

    #[test]
    fn test_config_validation() {
        let bad = SessionConfig {
            analytic_answer: 0.0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            IntegrationSession::new(bad),
            Err(Error::InvalidConfig(_))
        ));
        let bad = SessionConfig::default().with_default_cycle_samples(0);
        assert!(matches!(bad.validate(), Err(Error::InvalidConfig(_))));
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_first_cycle() {
        let session = seeded(1);
        let report = session.run_cycle(1000).unwrap();
        assert_eq!(report.total_guesses, 1000);
        assert_eq!(report.cycle_total, 1000);
        assert!(report.cycle_inside <= 1000);
        assert_abs_diff_eq!(
            report.estimate,
            report.cycle_inside as f64 / 1000.0,
            epsilon = 1e-12
        );

        let series = session.error_series();
        assert_eq!(series.len(), 1);
        assert_abs_diff_eq!(series[0].log_sample_count, 3.0, epsilon = 1e-12);
        assert_eq!(series[0].log_abs_rel_error, report.log_error);

        assert!(report.points_recorded);
        assert_eq!(
            report.points.inside.len() + report.points.outside.len(),
            1000
        );
        assert_eq!(report.points.inside.len() as u64, report.cycle_inside);
        assert!(!session.state().is_first_cycle);
    }

    #[test]
    fn test_zero_samples_leave_state_alone() {
        let session = seeded(2);
        session.run_cycle(10).unwrap();
        let before = session.state();
        assert_eq!(session.run_cycle(0), Err(Error::InvalidSampleCount(0)));
        assert_eq!(session.state(), before);
        assert_eq!(session.error_series().len(), 1);
        assert!(!session.is_busy());
    }

    #[test]
    fn test_estimate_before_first_cycle() {
        let session = seeded(3);
        assert_eq!(
            session.current_estimate(),
            Err(Error::UninitializedAccumulator)
        );
    }

    #[test]
    fn test_default_cycle_uses_configured_count() {
        let session = IntegrationSession::new(
            SessionConfig::default()
                .with_seed(4)
                .with_default_cycle_samples(321),
        )
        .unwrap();
        assert_eq!(session.run_default_cycle().unwrap().total_guesses, 321);
    }

    #[test]
    fn test_reset_clears_everything() {
        let session = seeded(5);
        session.run_cycle(500).unwrap();
        session.run_cycle(500).unwrap();
        session.reset().unwrap();

        assert_eq!(session.state(), IntegrationState::default());
        assert!(session.error_series().is_empty());
        assert!(session.points().inside.is_empty());
        assert!(session.points().outside.is_empty());

        // the first cycle after a reset records points again
        assert!(session.run_cycle(10).unwrap().points_recorded);
    }

    #[test]
    fn test_same_seed_same_results() {
        let a = seeded(77);
        let b = seeded(77);
        for n in [10, 1000, 5000] {
            assert_eq!(a.run_cycle(n).unwrap(), b.run_cycle(n).unwrap());
        }
    }

    #[test]
    fn test_accessors_reflect_construction() {
        let config = SessionConfig::default()
            .with_seed(6)
            .with_point_buffer_cap(42);
        let session = IntegrationSession::new(config.clone()).unwrap();
        assert_eq!(session.config(), &config);
        assert_eq!(session.integrand(), ExpMinusX);
        assert_eq!(session.bounding_box(), session.integrand().bounding_box());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_sessions_are_reproducible() {
        let config = SessionConfig::default()
            .with_seed(2718)
            .with_dense_point_threshold(100)
            .with_parallel(true);
        let a = IntegrationSession::new(config.clone()).unwrap();
        let b = IntegrationSession::new(config).unwrap();

        let first = a.run_cycle(200).unwrap();
        assert!(first.points_recorded);
        assert_eq!(first, b.run_cycle(200).unwrap());

        for n in [300_000, 70_001] {
            let frozen = a.run_cycle(n).unwrap();
            assert!(!frozen.points_recorded);
            assert_eq!(frozen.points, first.points);
            assert_eq!(frozen, b.run_cycle(n).unwrap());
        }
        assert_eq!(a.state().total_guesses, 370_201);
        assert!((a.current_estimate().unwrap() - ExpMinusX.analytic_integral()).abs() < 0.01);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serde_round_trip() {
        let config = SessionConfig::default()
            .with_seed(11)
            .with_dense_point_threshold(1_234)
            .with_parallel(true);
        let json = serde_json::to_string(&config).unwrap();
        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);

        let session = IntegrationSession::new(back).unwrap();
        session.run_cycle(100).unwrap();
        let sample = session.error_series()[0];
        let json = serde_json::to_string(&sample).unwrap();
        let back: ErrorSample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }
}
