//! Uniform point sampling inside a bounding box.

use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::error::Result;

use super::integrand::BoundingBox;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A sampled point. Plain `Copy` data, never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Draws points with independent, uniformly distributed coordinates inside a [`BoundingBox`].
///
/// The distributions are built once at construction, so [`sample`](Self::sample) only consumes
/// entropy from the generator and allocates nothing.
#[derive(Debug, Clone)]
pub struct RandomPointSampler<R> {
    rng: R,
    x_dist: Uniform<f64>,
    y_dist: Uniform<f64>,
}

impl<R: Rng> RandomPointSampler<R> {
    /// Creates a sampler over `bbox`, rejecting non-finite or inverted bounds.
    pub fn new(rng: R, bbox: BoundingBox) -> Result<Self> {
        bbox.validate()?;
        Ok(Self::from_valid_box(rng, bbox))
    }

    /// Sampler over the unit square `[0, 1] × [0, 1]`.
    pub fn unit(rng: R) -> Self {
        Self::from_valid_box(rng, BoundingBox::unit())
    }

    fn from_valid_box(rng: R, bbox: BoundingBox) -> Self {
        Self {
            rng,
            x_dist: Uniform::new_inclusive(bbox.x_min, bbox.x_max),
            y_dist: Uniform::new_inclusive(bbox.y_min, bbox.y_max),
        }
    }

    pub fn sample(&mut self) -> Point {
        let x = self.x_dist.sample(&mut self.rng);
        let y = self.y_dist.sample(&mut self.rng);
        Point { x, y }
    }

    /// Gives access to the underlying generator, e.g. to derive seeds for parallel work.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}
