//! Hit-or-miss Monte Carlo integration.
//!
//! A cycle draws `sample_count` points inside the bounding box and counts how many fall under
//! the curve. The tally of one cycle is returned as a [`CycleTally`] and is *not* merged into
//! any running totals here; merging belongs to the owner of the [`IntegrationState`]. That keeps
//! [`IntegrationAccumulator::run_cycle`] a pure function of its sampler and sample count.
//!
//! The running estimate after `n` total samples with `k` of them inside is
//!
//! ```text
//! I ≈ (k / n) · area(box)
//! ```
//!
//! # Example
//!
//! ```rust
//! use mccycle::math::monte_carlo::{IntegrationAccumulator, IntegrationState, RandomPointSampler};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let accumulator = IntegrationAccumulator::default();
//! let mut sampler = RandomPointSampler::unit(ChaCha20Rng::seed_from_u64(1));
//! let tally = accumulator.run_cycle(&mut sampler, 100_000).unwrap();
//!
//! let mut state = IntegrationState::default();
//! state.merge(tally);
//! let estimate = IntegrationAccumulator::current_estimate(&state, 1.0).unwrap();
//! assert!((estimate - 0.632).abs() < 0.01);
//! ```

use rand::Rng;

use crate::error::{Error, Result};

use super::classifier::PointClassifier;
use super::sampler::{Point, RandomPointSampler};

#[cfg(feature = "parallel")]
use super::integrand::BoundingBox;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of samples handled by one parallel work unit.
#[cfg(feature = "parallel")]
pub const PARALLEL_CHUNK: u64 = 65_536;

/// Inside/total counts of a single cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTally {
    pub inside: u64,
    pub total: u64,
}

/// Running totals across cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntegrationState {
    pub total_guesses: u64,
    pub total_inside: u64,
    pub is_first_cycle: bool,
}

impl Default for IntegrationState {
    fn default() -> Self {
        Self {
            total_guesses: 0,
            total_inside: 0,
            is_first_cycle: true,
        }
    }
}

impl IntegrationState {
    /// Adds a cycle's counts to the running totals.
    ///
    /// Does not touch `is_first_cycle`; that flag belongs to the point buffering policy.
    pub fn merge(&mut self, tally: CycleTally) {
        debug_assert!(tally.inside <= tally.total);
        self.total_guesses += tally.total;
        self.total_inside += tally.inside;
    }

    /// `total_inside / total_guesses`, or `None` before any samples.
    pub fn hit_ratio(&self) -> Option<f64> {
        (self.total_guesses > 0).then(|| self.total_inside as f64 / self.total_guesses as f64)
    }
}

/// Runs the sample/classify loop and turns running totals into an estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrationAccumulator {
    classifier: PointClassifier,
}

impl IntegrationAccumulator {
    pub fn new(classifier: PointClassifier) -> Self {
        Self { classifier }
    }

    /// Draws `sample_count` points and counts the inside ones.
    pub fn run_cycle<R: Rng>(
        &self,
        sampler: &mut RandomPointSampler<R>,
        sample_count: u64,
    ) -> Result<CycleTally> {
        self.run_cycle_with(sampler, sample_count, |_, _| {})
    }

    /// Like [`run_cycle`](Self::run_cycle), additionally handing every classified point to
    /// `on_point` in sampling order.
    pub fn run_cycle_with<R, F>(
        &self,
        sampler: &mut RandomPointSampler<R>,
        sample_count: u64,
        mut on_point: F,
    ) -> Result<CycleTally>
    where
        R: Rng,
        F: FnMut(Point, bool),
    {
        if sample_count == 0 {
            return Err(Error::InvalidSampleCount(sample_count));
        }

        let mut inside = 0;
        for _ in 0..sample_count {
            let point = sampler.sample();
            let is_inside = self.classifier.is_inside(&point);
            if is_inside {
                inside += 1;
            }
            on_point(point, is_inside);
        }

        Ok(CycleTally {
            inside,
            total: sample_count,
        })
    }

    /// Tallies a cycle on the rayon pool.
    ///
    /// The cycle is cut into [`PARALLEL_CHUNK`]-sized pieces; piece `k` samples from a
    /// `ChaCha20Rng` seeded with `cycle_seed` on stream `k`. The result therefore depends only
    /// on `cycle_seed` and `sample_count`, not on how many threads the pool has.
    #[cfg(feature = "parallel")]
    pub fn par_run_cycle(
        &self,
        bbox: BoundingBox,
        cycle_seed: u64,
        sample_count: u64,
    ) -> Result<CycleTally> {
        use rand::SeedableRng;
        use rand_chacha::ChaCha20Rng;
        use rayon::prelude::*;

        if sample_count == 0 {
            return Err(Error::InvalidSampleCount(sample_count));
        }
        bbox.validate()?;

        let classifier = self.classifier;
        let chunks = sample_count.div_ceil(PARALLEL_CHUNK);
        let inside = (0..chunks)
            .into_par_iter()
            .map(|k| -> Result<u64> {
                let len = PARALLEL_CHUNK.min(sample_count - k * PARALLEL_CHUNK);
                let mut rng = ChaCha20Rng::seed_from_u64(cycle_seed);
                rng.set_stream(k);
                let mut sampler = RandomPointSampler::new(rng, bbox)?;
                let hits = (0..len)
                    .filter(|_| classifier.is_inside(&sampler.sample()))
                    .count() as u64;
                log::trace!("parallel chunk {k}: {hits}/{len} inside");
                Ok(hits)
            })
            .sum::<Result<u64>>()?;

        Ok(CycleTally {
            inside,
            total: sample_count,
        })
    }

    /// `(total_inside / total_guesses) * box_area`
    ///
    /// Fails with [`Error::UninitializedAccumulator`] before the first merged cycle instead of
    /// dividing by zero.
    pub fn current_estimate(state: &IntegrationState, box_area: f64) -> Result<f64> {
        state
            .hit_ratio()
            .map(|ratio| ratio * box_area)
            .ok_or(Error::UninitializedAccumulator)
    }
}
