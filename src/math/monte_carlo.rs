//! Incremental Monte Carlo integration.
//!
//! Estimates `∫₀¹ exp(-x) dx = 1 - e⁻¹` by hit-or-miss sampling, spread over repeated cycles so
//! that a caller can watch the estimate converge.
//!
//! - [`sampler`]: uniform points in a bounding box
//! - [`classifier`]: inside/outside test against the curve
//! - [`monte_carlo_integration`]: per-cycle tally and the running estimate
//! - [`convergence`]: log-scale error series against the analytic value
//! - [`point_buffer`]: capped point storage for display
//! - [`session`]: one cycle at a time, merged atomically
//!
//! # Examples
//!
//! ```rust
//! use mccycle::math::monte_carlo::{IntegrationSession, SessionConfig};
//!
//! let session = IntegrationSession::new(SessionConfig::default().with_seed(9)).unwrap();
//! let report = session.run_cycle(1_000).unwrap();
//! assert_eq!(report.total_guesses, 1_000);
//! assert!(report.cycle_inside <= 1_000);
//! ```

pub mod classifier;
pub mod convergence;
pub mod integrand;
pub mod monte_carlo_integration;
pub mod point_buffer;
pub mod sampler;
pub mod session;

pub use classifier::{classify, PointClassifier};
pub use convergence::{
    is_degenerate, log_relative_error, ConvergenceTracker, ErrorSample, DEGENERATE_LOG_ERROR,
};
pub use integrand::{BoundingBox, ExpMinusX};
pub use monte_carlo_integration::{CycleTally, IntegrationAccumulator, IntegrationState};
pub use point_buffer::{PointBuffer, PointsSnapshot, StagedPoints};
pub use sampler::{Point, RandomPointSampler};
pub use session::{
    CycleReport, IntegrationSession, SessionConfig, DEFAULT_CYCLE_SAMPLES,
    DEFAULT_DENSE_POINT_THRESHOLD, DEFAULT_POINT_BUFFER_CAP,
};
