//! Hit-or-miss classification of sampled points against the integrand.

use super::integrand::ExpMinusX;
use super::sampler::Point;

/// Returns `true` when `point` lies on or under the curve `y = f(x)`.
pub fn classify<F>(point: &Point, f: F) -> bool
where
    F: Fn(f64) -> f64,
{
    point.y <= f(point.x)
}

/// Classifier bound to the fixed integrand.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointClassifier {
    integrand: ExpMinusX,
}

impl PointClassifier {
    pub fn new(integrand: ExpMinusX) -> Self {
        Self { integrand }
    }

    pub fn is_inside(&self, point: &Point) -> bool {
        classify(point, |x| self.integrand.eval(x))
    }
}
