//! ## Distance Metrics
//!
//! This module defines the `DistanceMetric` trait used by the nearest-neighbor search and
//! the four metrics shipped with the crate: plain and axis-weighted squared Euclidean
//! distance, and their translation-augmented variants for trees that index moving points.
//!
//! Every metric provides a point-to-point distance and a point-to-box lower bound. The
//! lower bound is the pruning primitive of the search: for any point `q` inside the
//! axis-aligned box `[min, max]`, `distance_to_box(p, min, max) <= distance(p, q)` must
//! hold, otherwise the search may discard subtrees that contain true neighbors.
//!
//! ### Example
//!
//! ```
//! use kdrift::distance::{DistanceMetric, SquaredEuclidean};
//!
//! let metric = SquaredEuclidean;
//! assert_eq!(metric.distance(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
//! assert_eq!(metric.distance_to_box(&[0.0, 5.0], &[1.0, 1.0], &[4.0, 4.0]), 2.0);
//! ```

use crate::errors::KdriftError;

/// Metric between points and from a point to an axis-aligned bounding box.
///
/// `distance_to_box` must be a monotone lower bound on `distance` for every point inside
/// the box. Implementations are queried once per candidate point and once per pruned
/// subtree during a search.
pub trait DistanceMetric {
    /// Returns the distance between two points. Never negative.
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    /// Returns a lower bound on the distance from `point` to any point inside the
    /// axis-aligned box spanned by `min` and `max`. Never negative.
    fn distance_to_box(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64;
}

/// Squared Euclidean distance. The default metric of the tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclidean;

impl DistanceMetric for SquaredEuclidean {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let mut sum = 0.0;
        for (x, y) in a.iter().zip(b.iter()) {
            let diff = x - y;
            sum += diff * diff;
        }
        sum
    }

    fn distance_to_box(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64 {
        let mut sum = 0.0;
        for d in 0..point.len() {
            if point[d] < min[d] {
                let diff = min[d] - point[d];
                sum += diff * diff;
            } else if point[d] > max[d] {
                let diff = point[d] - max[d];
                sum += diff * diff;
            }
        }
        sum
    }
}

/// Squared Euclidean distance with a per-dimension weight applied to each component
/// difference before squaring.
#[derive(Debug, Clone)]
pub struct WeightedSquaredEuclidean {
    weights: Vec<f64>,
}

impl WeightedSquaredEuclidean {
    /// Creates the metric for a tree with `dimensions` dimensions.
    ///
    /// # Errors
    ///
    /// Returns `KdriftError::InvalidDimensionality` if the weight vector does not have
    /// exactly `dimensions` entries.
    pub fn new(dimensions: usize, weights: Vec<f64>) -> Result<Self, KdriftError> {
        if weights.len() != dimensions {
            return Err(KdriftError::InvalidDimensionality {
                dimensions: weights.len(),
            });
        }
        Ok(WeightedSquaredEuclidean { weights })
    }
}

impl DistanceMetric for WeightedSquaredEuclidean {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let mut sum = 0.0;
        for d in 0..self.weights.len() {
            let diff = (a[d] - b[d]) * self.weights[d];
            sum += diff * diff;
        }
        sum
    }

    fn distance_to_box(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64 {
        let mut sum = 0.0;
        for d in 0..self.weights.len() {
            if point[d] < min[d] {
                let diff = (min[d] - point[d]) * self.weights[d];
                sum += diff * diff;
            } else if point[d] > max[d] {
                let diff = (point[d] - max[d]) * self.weights[d];
                sum += diff * diff;
            }
        }
        sum
    }
}

/// Squared Euclidean distance over predicted positions.
///
/// Point vectors use the layout `[pos(k), vel(k), t0]`, so a tree of dimensionality
/// `2k + 1` indexes `k` spatial axes. The effective position of a point at query time
/// `T` is `pos + vel * (T - t0)`; the distance is the squared Euclidean distance
/// between effective positions. The time source is read exactly once per call, so a
/// single `distance` or `distance_to_box` invocation evaluates both arguments at the
/// same instant. A whole query evaluates every candidate at one "now" only if the time
/// source is constant (or monotone and fast relative to the query); pass a fixed-time
/// closure for deterministic results.
///
/// The box lower bound translates `point`, `min`, and `max` each by their own stored
/// `t0` and then sums the per-axis excess. Box corners inherit the start times of the
/// extreme coordinates rather than a birth time of their own, which makes the bound an
/// approximation of the true reachable region: it may under-prune, never over-prune, as
/// long as callers calibrate thresholds against this metric.
pub struct TranslatedSquaredEuclidean<F: Fn() -> f64> {
    position_dims: usize,
    now: F,
}

impl<F: Fn() -> f64> TranslatedSquaredEuclidean<F> {
    /// Creates the metric for a tree with `dimensions` dimensions and the given time
    /// source. The time source is not called here.
    ///
    /// # Errors
    ///
    /// Returns `KdriftError::InvalidDimensionality` unless `dimensions` is odd and at
    /// least 3 (the `[pos(k), vel(k), t0]` layout).
    pub fn new(dimensions: usize, now: F) -> Result<Self, KdriftError> {
        if dimensions < 3 || dimensions % 2 == 0 {
            return Err(KdriftError::InvalidDimensionality { dimensions });
        }
        Ok(TranslatedSquaredEuclidean {
            position_dims: (dimensions - 1) / 2,
            now,
        })
    }

    /// Returns the number of spatial axes `k`.
    pub fn position_dims(&self) -> usize {
        self.position_dims
    }
}

impl<F: Fn() -> f64> std::fmt::Debug for TranslatedSquaredEuclidean<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatedSquaredEuclidean")
            .field("position_dims", &self.position_dims)
            .finish()
    }
}

impl<F: Fn() -> f64> DistanceMetric for TranslatedSquaredEuclidean<F> {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let t = (self.now)();
        let k = self.position_dims;
        let elapsed_a = t - a[2 * k];
        let elapsed_b = t - b[2 * k];
        let mut sum = 0.0;
        for d in 0..k {
            let pa = a[d] + a[k + d] * elapsed_a;
            let pb = b[d] + b[k + d] * elapsed_b;
            let diff = pa - pb;
            sum += diff * diff;
        }
        sum
    }

    fn distance_to_box(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64 {
        let t = (self.now)();
        let k = self.position_dims;
        let elapsed_p = t - point[2 * k];
        let elapsed_min = t - min[2 * k];
        let elapsed_max = t - max[2 * k];
        let mut sum = 0.0;
        for d in 0..k {
            let p = point[d] + point[k + d] * elapsed_p;
            let lo = min[d] + min[k + d] * elapsed_min;
            let hi = max[d] + max[k + d] * elapsed_max;
            if p < lo {
                let diff = lo - p;
                sum += diff * diff;
            } else if p > hi {
                let diff = p - hi;
                sum += diff * diff;
            }
        }
        sum
    }
}

/// Translation-augmented squared Euclidean distance with per-axis weights: effective
/// positions are computed first, then each component difference is scaled by its weight
/// before squaring. Only the `k` position-axis weights contribute to the distance.
pub struct WeightedTranslatedSquaredEuclidean<F: Fn() -> f64> {
    weights: Vec<f64>,
    position_dims: usize,
    now: F,
}

impl<F: Fn() -> f64> WeightedTranslatedSquaredEuclidean<F> {
    /// Creates the metric for a tree with `dimensions` dimensions, a weight vector of
    /// the same length, and the given time source. The time source is not called here.
    ///
    /// # Errors
    ///
    /// Returns `KdriftError::InvalidDimensionality` if `dimensions` is even or below 3,
    /// or if the weight vector does not have exactly `dimensions` entries.
    pub fn new(dimensions: usize, weights: Vec<f64>, now: F) -> Result<Self, KdriftError> {
        if dimensions < 3 || dimensions % 2 == 0 {
            return Err(KdriftError::InvalidDimensionality { dimensions });
        }
        if weights.len() != dimensions {
            return Err(KdriftError::InvalidDimensionality {
                dimensions: weights.len(),
            });
        }
        Ok(WeightedTranslatedSquaredEuclidean {
            weights,
            position_dims: (dimensions - 1) / 2,
            now,
        })
    }
}

impl<F: Fn() -> f64> std::fmt::Debug for WeightedTranslatedSquaredEuclidean<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightedTranslatedSquaredEuclidean")
            .field("position_dims", &self.position_dims)
            .field("weights", &self.weights)
            .finish()
    }
}

impl<F: Fn() -> f64> DistanceMetric for WeightedTranslatedSquaredEuclidean<F> {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let t = (self.now)();
        let k = self.position_dims;
        let elapsed_a = t - a[2 * k];
        let elapsed_b = t - b[2 * k];
        let mut sum = 0.0;
        for d in 0..k {
            let pa = a[d] + a[k + d] * elapsed_a;
            let pb = b[d] + b[k + d] * elapsed_b;
            let diff = (pa - pb) * self.weights[d];
            sum += diff * diff;
        }
        sum
    }

    fn distance_to_box(&self, point: &[f64], min: &[f64], max: &[f64]) -> f64 {
        let t = (self.now)();
        let k = self.position_dims;
        let elapsed_p = t - point[2 * k];
        let elapsed_min = t - min[2 * k];
        let elapsed_max = t - max[2 * k];
        let mut sum = 0.0;
        for d in 0..k {
            let p = point[d] + point[k + d] * elapsed_p;
            let lo = min[d] + min[k + d] * elapsed_min;
            let hi = max[d] + max[k + d] * elapsed_max;
            if p < lo {
                let diff = (lo - p) * self.weights[d];
                sum += diff * diff;
            } else if p > hi {
                let diff = (p - hi) * self.weights[d];
                sum += diff * diff;
            }
        }
        sum
    }
}
