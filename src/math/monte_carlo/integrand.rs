//! The target integrand and the rectangular domain it is sampled over.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rectangular sampling domain `[x_min, x_max] × [y_min, y_max]`.
///
/// The ratio of inside points to total points is converted into an integral estimate by
/// multiplying with [`BoundingBox::area`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl BoundingBox {
    /// Creates a bounding box, rejecting non-finite or inverted bounds.
    ///
    /// Degenerate boxes (zero width or height) are allowed; they have zero area.
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<Self> {
        let bbox = Self {
            x_min,
            x_max,
            y_min,
            y_max,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Checks the bounds of a box that may have been built as a struct literal.
    pub fn validate(&self) -> Result<()> {
        let Self {
            x_min,
            x_max,
            y_min,
            y_max,
        } = *self;
        if [x_min, x_max, y_min, y_max].iter().any(|b| !b.is_finite()) {
            return Err(Error::InvalidBoundingBox(format!(
                "bounds must be finite, got x=[{x_min}, {x_max}] y=[{y_min}, {y_max}]"
            )));
        }
        if x_min > x_max || y_min > y_max {
            return Err(Error::InvalidBoundingBox(format!(
                "bounds are inverted, got x=[{x_min}, {x_max}] y=[{y_min}, {y_max}]"
            )));
        }
        Ok(())
    }

    /// The unit square `[0, 1] × [0, 1]`.
    pub const fn unit() -> Self {
        Self {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
        }
    }

    /// `(x_max - x_min) * (y_max - y_min)`
    pub fn area(&self) -> f64 {
        (self.x_max - self.x_min) * (self.y_max - self.y_min)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.y_min..=self.y_max).contains(&y)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::unit()
    }
}

/// The fixed integrand `f(x) = exp(-x)` on `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpMinusX;

impl ExpMinusX {
    pub const X_MIN: f64 = 0.0;
    pub const X_MAX: f64 = 1.0;

    pub fn eval(&self, x: f64) -> f64 {
        (-x).exp()
    }

    /// Closed form of the integral over `[0, 1]`: `1 - e^-1`.
    pub fn analytic_integral(&self) -> f64 {
        1.0 - (-1.0f64).exp()
    }

    /// Sampling box `[X_MIN, X_MAX] × [0, f(X_MIN)]`.
    ///
    /// `exp(-x)` is decreasing and positive, so its maximum on the interval is at `X_MIN` and
    /// its minimum is above zero. The box height is taken from the integrand instead of being
    /// fixed at one; for this interval the two agree and the box is the unit square.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            x_min: Self::X_MIN,
            x_max: Self::X_MAX,
            y_min: 0.0,
            y_max: self.eval(Self::X_MIN),
        }
    }
}
