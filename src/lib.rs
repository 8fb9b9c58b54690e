//! Incremental Monte Carlo estimation of `∫₀¹ exp(-x) dx` with convergence tracking.
//!
//! See [`math::monte_carlo`] for the components and [`IntegrationSession`] for the entry point.

pub mod error;
pub mod math;

pub use error::{Error, Result};
pub use math::{
    CycleReport, ErrorSample, IntegrationSession, IntegrationState, Point, SessionConfig,
};

#[cfg(doctest)]
#[doc = include_str!("../README.md")]
struct ReadmeDoctests;
