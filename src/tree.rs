//! ## Dynamic Kd-tree Container
//!
//! This module provides the public container of the crate: a kd-tree over points of a
//! fixed dimensionality, each carrying an opaque payload. Points are addressed by stable
//! integer indices that survive unrelated removals; vacated indices become holes that
//! are refilled by later insertions (highest hole first).
//!
//! The container supports insertion, deletion, in-place movement of points, bounded
//! k-nearest-neighbor queries under a pluggable metric, and an explicit rebuild that
//! bounds the imbalance accumulated by motion.
//!
//! ### Example
//!
//! ```
//! use kdrift::tree::KdTree;
//!
//! let mut tree: KdTree<&str> = KdTree::new(2, 4).unwrap();
//! tree.add(&[1.0, 2.0], "a").unwrap();
//! tree.add(&[3.0, 4.0], "b").unwrap();
//! tree.move_point(&[5.0, 5.0], &"a").unwrap();
//!
//! let nearest: Vec<&str> = tree
//!     .nearest_neighbors(&[4.5, 4.5], 1)
//!     .unwrap()
//!     .map(|(_dist, payload)| *payload)
//!     .collect();
//! assert_eq!(nearest, vec!["a"]);
//! ```

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::distance::{DistanceMetric, SquaredEuclidean};
use crate::errors::KdriftError;
use crate::node::KdNode;
use crate::search::NearestNeighbors;

/// A dynamic kd-tree of points with stable indices and attached payloads.
///
/// The tree is single-owner: mutation requires `&mut self`, and a search iterator holds
/// a shared borrow of the tree for its whole lifetime, so the borrow checker rules out
/// mutation during iteration.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KdTree<T> {
    dimensions: usize,
    bucket_capacity: usize,
    root: KdNode,
    points: Vec<Vec<f64>>,
    payloads: Vec<Option<T>>,
    /// Vacated indices, kept sorted ascending; the highest is reused first.
    holes: Vec<usize>,
    removal_count: usize,
}

impl<T> KdTree<T> {
    /// Returns the dimensionality the tree was built with.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Returns the leaf bucket capacity the tree was built with.
    pub fn bucket_capacity(&self) -> usize {
        self.bucket_capacity
    }

    /// Returns the number of live points.
    pub fn len(&self) -> usize {
        self.payloads.len() - self.holes.len()
    }

    /// Returns `true` if the tree holds no live points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of removals and cross-leaf moves since the last rebuild.
    ///
    /// Removals leave bounding boxes loose and cross-leaf moves skew the tree, so this
    /// counter is the suggested rebuild heuristic: rebuilding once it exceeds roughly
    /// twice [`len`](Self::len) keeps queries fast under sustained motion.
    pub fn removal_count(&self) -> usize {
        self.removal_count
    }

    /// Returns the root node, for inspection of the tree structure.
    pub fn root(&self) -> &KdNode {
        &self.root
    }

    pub(crate) fn point_slice(&self, index: usize) -> &[f64] {
        &self.points[index]
    }

    pub(crate) fn points_array(&self) -> &[Vec<f64>] {
        &self.points
    }

    pub(crate) fn payload_ref(&self, index: usize) -> &T {
        self.payloads[index].as_ref().unwrap()
    }
}

impl<T: PartialEq + fmt::Debug> KdTree<T> {
    /// Creates an empty tree for points with `dimensions` coordinates and leaves that
    /// hold `bucket_capacity` points before splitting.
    ///
    /// # Errors
    ///
    /// Returns `KdriftError::InvalidDimensionality` if `dimensions` is zero and
    /// `KdriftError::InvalidCapacity` if `bucket_capacity` is zero.
    pub fn new(dimensions: usize, bucket_capacity: usize) -> Result<Self, KdriftError> {
        if dimensions < 1 {
            return Err(KdriftError::InvalidDimensionality { dimensions });
        }
        if bucket_capacity < 1 {
            return Err(KdriftError::InvalidCapacity {
                capacity: bucket_capacity,
            });
        }
        info!(
            "Creating new KdTree with {} dimensions and bucket capacity {}",
            dimensions, bucket_capacity
        );
        Ok(KdTree {
            dimensions,
            bucket_capacity,
            root: KdNode::new(dimensions, bucket_capacity),
            points: Vec::new(),
            payloads: Vec::new(),
            holes: Vec::new(),
            removal_count: 0,
        })
    }

    /// Inserts a point with its payload and returns the stable index assigned to it.
    /// The highest vacated index is reused if one exists.
    ///
    /// # Errors
    ///
    /// Returns `KdriftError::DimensionMismatch` if the point's length differs from the
    /// tree's dimensionality. The tree is left untouched on error.
    pub fn add(&mut self, point: &[f64], payload: T) -> Result<usize, KdriftError> {
        if point.len() != self.dimensions {
            return Err(KdriftError::DimensionMismatch {
                expected: self.dimensions,
                actual: point.len(),
            });
        }
        info!("Inserting point {:?} with payload {:?}", point, payload);
        let index = match self.holes.pop() {
            Some(hole) => {
                self.points[hole] = point.to_vec();
                self.payloads[hole] = Some(payload);
                hole
            }
            None => {
                self.points.push(point.to_vec());
                self.payloads.push(Some(payload));
                self.points.len() - 1
            }
        };
        self.root.add_point(index, &self.points);
        Ok(index)
    }

    /// Positional insertion at a caller-chosen index.
    ///
    /// # Errors
    ///
    /// Always returns `KdriftError::UnsupportedOperation`: stable indices are assigned
    /// by the tree and cannot be dictated by the caller.
    pub fn insert_at(
        &mut self,
        _index: usize,
        _point: &[f64],
        _payload: T,
    ) -> Result<(), KdriftError> {
        Err(KdriftError::UnsupportedOperation {
            operation: "positional insertion",
        })
    }

    /// Removes the first live point whose payload equals `payload`.
    ///
    /// # Returns
    ///
    /// `true` if a point was found and removed, otherwise `false`.
    pub fn remove(&mut self, payload: &T) -> bool {
        match self.find_index(payload) {
            Some(index) => {
                self.remove_at(index).unwrap();
                true
            }
            None => false,
        }
    }

    /// Removes the point at a stable index.
    ///
    /// The vacated index becomes a hole available for reuse, unless it was the highest
    /// live index, in which case the used range contracts past it and past any holes
    /// directly below it.
    ///
    /// # Errors
    ///
    /// Returns `KdriftError::IndexOutOfRange` if `index` is a hole or lies outside the
    /// used range. The tree is left untouched on error.
    pub fn remove_at(&mut self, index: usize) -> Result<(), KdriftError> {
        self.ensure_live(index)?;
        info!("Removing point at index {}", index);
        self.root.remove_point(index, &self.points[index]);
        self.points[index] = Vec::new();
        self.payloads[index] = None;
        if index == self.payloads.len() - 1 {
            self.points.pop();
            self.payloads.pop();
            while !self.payloads.is_empty()
                && self.holes.last() == Some(&(self.payloads.len() - 1))
            {
                self.holes.pop();
                self.points.pop();
                self.payloads.pop();
            }
        } else if let Err(position) = self.holes.binary_search(&index) {
            self.holes.insert(position, index);
        }
        self.removal_count += 1;
        Ok(())
    }

    /// Moves the first live point whose payload equals `payload` to `new_point`,
    /// relocating it inside the tree without disturbing its stable index.
    ///
    /// # Returns
    ///
    /// `true` if the payload was found, otherwise `false`.
    ///
    /// # Errors
    ///
    /// Returns `KdriftError::DimensionMismatch` if `new_point` has the wrong length.
    /// The tree is left untouched on error.
    pub fn move_point(&mut self, new_point: &[f64], payload: &T) -> Result<bool, KdriftError> {
        if new_point.len() != self.dimensions {
            return Err(KdriftError::DimensionMismatch {
                expected: self.dimensions,
                actual: new_point.len(),
            });
        }
        match self.find_index(payload) {
            Some(index) => {
                self.relocate(index, new_point);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Moves the point at a stable index to `new_point`.
    ///
    /// # Errors
    ///
    /// Returns `KdriftError::DimensionMismatch` if `new_point` has the wrong length and
    /// `KdriftError::IndexOutOfRange` if `index` is a hole or out of bounds. The tree
    /// is left untouched on error.
    pub fn move_point_at(&mut self, index: usize, new_point: &[f64]) -> Result<(), KdriftError> {
        if new_point.len() != self.dimensions {
            return Err(KdriftError::DimensionMismatch {
                expected: self.dimensions,
                actual: new_point.len(),
            });
        }
        self.ensure_live(index)?;
        self.relocate(index, new_point);
        Ok(())
    }

    /// Returns a copy of the point stored for the first payload equal to `payload`.
    pub fn get_point(&self, payload: &T) -> Option<Vec<f64>> {
        self.find_index(payload).map(|index| self.points[index].clone())
    }

    /// Returns a copy of the point at a stable index.
    ///
    /// # Errors
    ///
    /// Returns `KdriftError::IndexOutOfRange` if `index` is a hole or out of bounds.
    pub fn get_point_at(&self, index: usize) -> Result<Vec<f64>, KdriftError> {
        self.ensure_live(index)?;
        Ok(self.points[index].clone())
    }

    /// Returns `true` if some live point carries a payload equal to `payload`.
    pub fn contains(&self, payload: &T) -> bool {
        self.find_index(payload).is_some()
    }

    /// Rebuilds the tree from scratch, reinserting every live point in ascending index
    /// order and resetting [`removal_count`](Self::removal_count) to zero.
    ///
    /// This is the caller's lever against the imbalance and stale bounding boxes left
    /// behind by removals and cross-leaf moves; stable indices are unaffected.
    pub fn rebuild(&mut self) {
        info!("Rebuilding tree with {} live points", self.len());
        self.root.clear();
        self.removal_count = 0;
        for index in 0..self.payloads.len() {
            if self.payloads[index].is_some() {
                self.root.add_point(index, &self.points);
            }
        }
    }

    /// Iterates over `(stable index, point, payload)` triples in ascending index order,
    /// skipping holes. Insertion order is not preserved.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[f64], &T)> {
        self.payloads
            .iter()
            .enumerate()
            .filter_map(move |(index, slot)| {
                slot.as_ref()
                    .map(|payload| (index, self.points[index].as_slice(), payload))
            })
    }

    /// Starts an unbounded k-nearest-neighbor search under the default squared
    /// Euclidean metric. See [`nearest_neighbors_with`](Self::nearest_neighbors_with).
    ///
    /// # Errors
    ///
    /// Returns `KdriftError::DimensionMismatch` if `search_point` has the wrong length.
    pub fn nearest_neighbors(
        &self,
        search_point: &[f64],
        k: usize,
    ) -> Result<NearestNeighbors<'_, T, SquaredEuclidean>, KdriftError> {
        self.nearest_neighbors_with(search_point, k, -1.0, SquaredEuclidean)
    }

    /// Starts a k-nearest-neighbor search around `search_point` under `metric`,
    /// returning an iterator that emits `(distance, payload)` pairs in non-decreasing
    /// distance order.
    ///
    /// At most `k` points are emitted; when `threshold` is non-negative, only points
    /// within that distance are emitted (a negative threshold means unbounded). The
    /// iterator borrows the tree, so the tree cannot be mutated until it is dropped.
    ///
    /// # Errors
    ///
    /// Returns `KdriftError::DimensionMismatch` if `search_point` has the wrong length.
    pub fn nearest_neighbors_with<M: DistanceMetric>(
        &self,
        search_point: &[f64],
        k: usize,
        threshold: f64,
        metric: M,
    ) -> Result<NearestNeighbors<'_, T, M>, KdriftError> {
        if search_point.len() != self.dimensions {
            return Err(KdriftError::DimensionMismatch {
                expected: self.dimensions,
                actual: search_point.len(),
            });
        }
        info!(
            "Searching {} nearest neighbors around {:?} with threshold {}",
            k, search_point, threshold
        );
        Ok(NearestNeighbors::new(
            self,
            search_point.to_vec(),
            k,
            threshold,
            metric,
        ))
    }

    fn relocate(&mut self, index: usize, new_point: &[f64]) {
        debug!("Moving point at index {} to {:?}", index, new_point);
        let old_point = std::mem::replace(&mut self.points[index], new_point.to_vec());
        if !self.root.move_point(&old_point, index, &self.points) {
            self.removal_count += 1;
        }
    }

    fn find_index(&self, payload: &T) -> Option<usize> {
        self.payloads
            .iter()
            .position(|slot| slot.as_ref() == Some(payload))
    }

    fn ensure_live(&self, index: usize) -> Result<(), KdriftError> {
        if index >= self.payloads.len() || self.payloads[index].is_none() {
            return Err(KdriftError::IndexOutOfRange {
                index,
                size: self.payloads.len(),
            });
        }
        Ok(())
    }
}
