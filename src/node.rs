//! ## Kd-tree Node
//!
//! This module implements the bucket-splitting node of the dynamic kd-tree. A node is
//! either a leaf owning a growable array of stable point indices, or an internal node
//! owning a split dimension, a split value, and two children. Every node maintains an
//! axis-aligned bounding box over the points of its subtree and a count of those points.
//!
//! A full leaf splits along its widest dimension at the midpoint of its bounds. Leaves
//! whose points all share the same coordinates cannot split and grow their slot array
//! instead. Bounding boxes are extended on insertion and movement but deliberately not
//! shrunk on removal; rebuilding the tree is the remedy for bounds that have grown
//! stale (see [`crate::tree::KdTree::rebuild`]).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::KdriftError;

/// A node of the dynamic kd-tree: a bucketed leaf or an internal split node.
///
/// Points live in the container's flat array; nodes store only stable indices into it,
/// so every operation that needs coordinates takes the array as an argument.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KdNode {
    dimensions: usize,
    bucket_capacity: usize,
    slot_capacity: usize,
    size: usize,
    single_point: bool,
    min_bound: Vec<f64>,
    max_bound: Vec<f64>,
    split_dimension: usize,
    split_value: f64,
    slots: Vec<usize>,
    left: Option<Box<KdNode>>,
    right: Option<Box<KdNode>>,
}

impl KdNode {
    pub(crate) fn new(dimensions: usize, bucket_capacity: usize) -> Self {
        KdNode {
            dimensions,
            bucket_capacity,
            slot_capacity: bucket_capacity,
            size: 0,
            single_point: true,
            min_bound: Vec::new(),
            max_bound: Vec::new(),
            split_dimension: 0,
            split_value: 0.0,
            slots: Vec::with_capacity(bucket_capacity),
            left: None,
            right: None,
        }
    }

    /// Returns the number of points indexed by this subtree.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns `true` if this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.left.is_none()
    }

    /// Returns `true` if every point of this subtree has identical coordinates on all
    /// non-NaN dimensions.
    pub fn single_point(&self) -> bool {
        self.single_point
    }

    /// Returns the split dimension of an internal node. Meaningless for leaves.
    pub fn split_dimension(&self) -> usize {
        self.split_dimension
    }

    /// Returns the split value of an internal node. Points strictly greater along the
    /// split dimension belong to the right child. Meaningless for leaves.
    pub fn split_value(&self) -> f64 {
        self.split_value
    }

    /// Returns a copy of the lower bounding-box corner, or `None` if the subtree has
    /// never held a point.
    pub fn min_bound(&self) -> Option<Vec<f64>> {
        if self.min_bound.is_empty() {
            None
        } else {
            Some(self.min_bound.clone())
        }
    }

    /// Returns a copy of the upper bounding-box corner, or `None` if the subtree has
    /// never held a point.
    pub fn max_bound(&self) -> Option<Vec<f64>> {
        if self.max_bound.is_empty() {
            None
        } else {
            Some(self.max_bound.clone())
        }
    }

    /// Returns the left child of an internal node.
    pub fn left(&self) -> Option<&KdNode> {
        self.left.as_deref()
    }

    /// Returns the right child of an internal node.
    pub fn right(&self) -> Option<&KdNode> {
        self.right.as_deref()
    }

    /// Returns the number of slots stored in this leaf. Zero for internal nodes.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the stable index stored at position `i` of this leaf.
    ///
    /// # Errors
    ///
    /// Returns `KdriftError::IndexOutOfRange` if `i` is not a valid slot position,
    /// which includes every position of an internal node.
    pub fn slot_index(&self, i: usize) -> Result<usize, KdriftError> {
        self.slots
            .get(i)
            .copied()
            .ok_or(KdriftError::IndexOutOfRange {
                index: i,
                size: self.slots.len(),
            })
    }

    pub(crate) fn slots(&self) -> &[usize] {
        &self.slots
    }

    pub(crate) fn bounds(&self) -> (&[f64], &[f64]) {
        (&self.min_bound, &self.max_bound)
    }

    /// Routes `index` to its leaf, extending bounds and sizes along the path, and
    /// splits the destination leaf if the insertion filled it.
    pub(crate) fn add_point(&mut self, index: usize, points: &[Vec<f64>]) {
        let point = &points[index];
        self.extend_bounds(point);
        self.size += 1;
        if self.is_leaf() {
            self.slots.push(index);
            if self.slots.len() >= self.slot_capacity {
                self.split_or_grow(points);
            }
        } else {
            self.child_for(point).add_point(index, points);
        }
    }

    /// Removes `index` from the leaf that `old_point` routes to. Returns `true` when
    /// the index was found; ancestor sizes are decremented on the way back up.
    /// Bounding boxes are left untouched.
    pub(crate) fn remove_point(&mut self, index: usize, old_point: &[f64]) -> bool {
        if self.is_leaf() {
            if let Some(position) = self.slots.iter().position(|&slot| slot == index) {
                self.slots.remove(position);
                self.size -= 1;
                return true;
            }
            return false;
        }
        let removed = self.child_for(old_point).remove_point(index, old_point);
        if removed {
            self.size -= 1;
        }
        removed
    }

    /// Relocates `index` after its coordinates changed from `old_point` to
    /// `points[index]`. Returns `true` when the point stayed in its leaf and only the
    /// bounds needed extending, `false` when it was removed and re-inserted across
    /// leaves. The container counts the latter toward its rebuild heuristic.
    pub(crate) fn move_point(
        &mut self,
        old_point: &[f64],
        index: usize,
        points: &[Vec<f64>],
    ) -> bool {
        if self.extend_toward(index, &points[index]) {
            return true;
        }
        self.remove_point(index, old_point);
        self.add_point(index, points);
        false
    }

    /// Resets this node to an empty leaf, dropping any children.
    pub(crate) fn clear(&mut self) {
        self.size = 0;
        self.single_point = true;
        self.min_bound = Vec::new();
        self.max_bound = Vec::new();
        self.split_dimension = 0;
        self.split_value = 0.0;
        self.slot_capacity = self.bucket_capacity;
        self.slots = Vec::with_capacity(self.bucket_capacity);
        self.left = None;
        self.right = None;
    }

    // Descends along the new point, extending bounds on the way. Returns true if the
    // destination leaf already holds the index. The eager extension is sound in the
    // cross-leaf case too: re-insertion follows the identical path.
    fn extend_toward(&mut self, index: usize, point: &[f64]) -> bool {
        if self.is_leaf() {
            if self.slots.contains(&index) {
                self.extend_bounds(point);
                return true;
            }
            return false;
        }
        self.extend_bounds(point);
        self.child_for(point).extend_toward(index, point)
    }

    fn child_for(&mut self, point: &[f64]) -> &mut KdNode {
        if point[self.split_dimension] > self.split_value {
            self.right.as_mut().unwrap()
        } else {
            self.left.as_mut().unwrap()
        }
    }

    // Grows the box to include `point`. A NaN coordinate poisons its dimension: the
    // bounds become NaN and the dimension stops participating in splits.
    fn extend_bounds(&mut self, point: &[f64]) {
        if self.min_bound.is_empty() {
            self.min_bound = point.to_vec();
            self.max_bound = point.to_vec();
            return;
        }
        for d in 0..self.dimensions {
            if point[d].is_nan() {
                if !self.min_bound[d].is_nan() || !self.max_bound[d].is_nan() {
                    self.single_point = false;
                }
                self.min_bound[d] = f64::NAN;
                self.max_bound[d] = f64::NAN;
            } else if self.min_bound[d] > point[d] {
                self.min_bound[d] = point[d];
                self.single_point = false;
            } else if self.max_bound[d] < point[d] {
                self.max_bound[d] = point[d];
                self.single_point = false;
            }
        }
    }

    // Splits a full leaf along its widest dimension, or grows the slot array when no
    // dimension has positive width.
    fn split_or_grow(&mut self, points: &[Vec<f64>]) {
        if self.single_point {
            self.slot_capacity += self.bucket_capacity;
            return;
        }

        let mut widest = 0;
        let mut max_width = 0.0;
        for d in 0..self.dimensions {
            let mut width = self.max_bound[d] - self.min_bound[d];
            if width.is_nan() {
                width = 0.0;
            }
            if width > max_width {
                max_width = width;
                widest = d;
            }
        }
        if max_width == 0.0 {
            self.slot_capacity += self.bucket_capacity;
            return;
        }

        let mut split_value = (self.min_bound[widest] + self.max_bound[widest]) / 2.0;
        if split_value == f64::INFINITY {
            split_value = f64::MAX;
        } else if split_value == f64::NEG_INFINITY {
            split_value = f64::MIN;
        }
        // Rounding can pull the midpoint onto the upper bound, which would route every
        // point left forever.
        if split_value == self.max_bound[widest] {
            split_value = self.min_bound[widest];
        }

        debug!(
            "Splitting leaf of {} points on dimension {} at {}",
            self.slots.len(),
            widest,
            split_value
        );

        let mut left = Box::new(KdNode::new(self.dimensions, self.bucket_capacity));
        let mut right = Box::new(KdNode::new(self.dimensions, self.bucket_capacity));
        for &index in &self.slots {
            let point = &points[index];
            let child = if point[widest] > split_value {
                &mut right
            } else {
                &mut left
            };
            child.extend_bounds(point);
            child.size += 1;
            child.slots.push(index);
        }

        self.split_dimension = widest;
        self.split_value = split_value;
        self.slots = Vec::new();
        self.left = Some(left);
        self.right = Some(right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points_from(rows: &[&[f64]]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| row.to_vec()).collect()
    }

    fn add_all(node: &mut KdNode, points: &[Vec<f64>]) {
        for index in 0..points.len() {
            node.add_point(index, points);
        }
    }

    #[test]
    fn test_leaf_splits_on_widest_dimension() {
        let points = points_from(&[
            &[0.0, 0.0],
            &[10.0, 1.0],
            &[2.0, 0.5],
            &[8.0, 0.2],
            &[5.0, 0.8],
        ]);
        let mut node = KdNode::new(2, 4);
        add_all(&mut node, &points);
        assert!(!node.is_leaf());
        assert_eq!(node.split_dimension(), 0);
        assert_eq!(node.split_value(), 5.0);
        assert_eq!(node.size(), 5);
        let left = node.left().unwrap();
        let right = node.right().unwrap();
        assert_eq!(left.size() + right.size(), 5);
        // The point exactly on the split value routes left.
        assert!(left.slots().contains(&4));
    }

    #[test]
    fn test_identical_points_grow_instead_of_splitting() {
        let points = vec![vec![3.0, 3.0]; 10];
        let mut node = KdNode::new(2, 2);
        add_all(&mut node, &points);
        assert!(node.is_leaf());
        assert!(node.single_point());
        assert_eq!(node.size(), 10);
    }

    #[test]
    fn test_split_value_never_equals_upper_bound() {
        // Adjacent doubles: the midpoint rounds up onto the max bound.
        let lo: f64 = 1.0;
        let hi = f64::from_bits(lo.to_bits() + 1);
        let points = points_from(&[&[lo], &[hi], &[lo], &[hi]]);
        let mut node = KdNode::new(1, 4);
        add_all(&mut node, &points);
        assert!(!node.is_leaf());
        assert!(node.split_value() < hi);
        assert_eq!(node.right().unwrap().size(), 2);
        assert_eq!(node.left().unwrap().size(), 2);
    }

    #[test]
    fn test_infinite_midpoint_is_clamped() {
        // min + max overflows to infinity, so the midpoint clamps to the finite
        // extremum and then falls back to the lower bound.
        let lo = 0.6 * f64::MAX;
        let points = points_from(&[&[f64::MAX], &[lo], &[f64::MAX], &[lo]]);
        let mut node = KdNode::new(1, 4);
        add_all(&mut node, &points);
        assert!(!node.is_leaf());
        assert!(node.split_value().is_finite());
        assert_eq!(node.split_value(), lo);
        assert_eq!(node.right().unwrap().size(), 2);
    }

    #[test]
    fn test_nan_dimension_is_not_splittable() {
        let points = points_from(&[
            &[f64::NAN, 0.0],
            &[f64::NAN, 1.0],
            &[f64::NAN, 2.0],
            &[f64::NAN, 3.0],
        ]);
        let mut node = KdNode::new(2, 4);
        add_all(&mut node, &points);
        assert!(!node.is_leaf());
        assert_eq!(node.split_dimension(), 1);
        assert!(node.min_bound().unwrap()[0].is_nan());
        assert!(node.max_bound().unwrap()[0].is_nan());
    }

    #[test]
    fn test_remove_decrements_sizes_up_the_path() {
        let points = points_from(&[
            &[0.0, 0.0],
            &[10.0, 1.0],
            &[2.0, 0.5],
            &[8.0, 0.2],
            &[5.0, 0.8],
        ]);
        let mut node = KdNode::new(2, 4);
        add_all(&mut node, &points);
        assert!(node.remove_point(1, &points[1]));
        assert_eq!(node.size(), 4);
        assert!(!node.remove_point(1, &points[1]));
        assert_eq!(node.size(), 4);
    }

    #[test]
    fn test_remove_keeps_bounds_loose() {
        let points = points_from(&[&[0.0], &[100.0], &[50.0], &[25.0]]);
        let mut node = KdNode::new(1, 4);
        add_all(&mut node, &points);
        let max_before = node.max_bound().unwrap();
        assert!(node.remove_point(1, &points[1]));
        assert_eq!(node.max_bound().unwrap(), max_before);
    }

    #[test]
    fn test_move_within_leaf_reports_true() {
        let mut points = points_from(&[&[1.0, 1.0], &[2.0, 2.0]]);
        let mut node = KdNode::new(2, 4);
        add_all(&mut node, &points);
        let old = points[0].clone();
        points[0] = vec![1.5, 1.5];
        assert!(node.move_point(&old, 0, &points));
        assert_eq!(node.size(), 2);
    }

    #[test]
    fn test_move_across_leaves_reports_false() {
        let points_initial = points_from(&[
            &[0.0, 0.0],
            &[10.0, 1.0],
            &[2.0, 0.5],
            &[8.0, 0.2],
            &[5.0, 0.8],
        ]);
        let mut node = KdNode::new(2, 4);
        add_all(&mut node, &points_initial);
        assert!(!node.is_leaf());

        let mut points = points_initial.clone();
        let old = points[0].clone();
        points[0] = vec![9.5, 0.9];
        assert!(!node.move_point(&old, 0, &points));
        assert_eq!(node.size(), 5);
        // The point is now findable under its new coordinates.
        assert!(node.remove_point(0, &points[0]));
        assert_eq!(node.size(), 4);
    }

    #[test]
    fn test_clear_resets_to_empty_leaf() {
        let points = points_from(&[&[0.0], &[1.0], &[2.0], &[3.0], &[4.0]]);
        let mut node = KdNode::new(1, 2);
        add_all(&mut node, &points);
        assert!(!node.is_leaf());
        node.clear();
        assert!(node.is_leaf());
        assert_eq!(node.size(), 0);
        assert!(node.min_bound().is_none());
    }

    #[test]
    fn test_slot_index_bounds_check() {
        let points = points_from(&[&[0.0], &[1.0]]);
        let mut node = KdNode::new(1, 4);
        add_all(&mut node, &points);
        assert_eq!(node.slot_index(0).unwrap(), 0);
        assert_eq!(node.slot_index(1).unwrap(), 1);
        assert!(matches!(
            node.slot_index(2),
            Err(KdriftError::IndexOutOfRange { index: 2, size: 2 })
        ));
    }
}
