//! ## Best-first Nearest-Neighbor Search
//!
//! This module drives the k-nearest-neighbor query as an external iterator. Two
//! priority queues cooperate: a min-heap of pending subtrees keyed by their
//! box-distance lower bound, and an interval heap of the current best candidates keyed
//! by their exact distance. A subtree is only expanded while its lower bound beats the
//! best unreturned candidate, so the search terminates early once the candidate set
//! provably cannot improve.
//!
//! The iterator borrows the tree for its lifetime; emitted payloads come out in
//! non-decreasing distance order.

use crate::distance::DistanceMetric;
use crate::interval_heap::IntervalHeap;
use crate::min_heap::MinHeap;
use crate::node::KdNode;
use crate::tree::KdTree;

/// Iterator over the `k` nearest neighbors of a search point, nearest first.
///
/// Created by [`KdTree::nearest_neighbors`] and [`KdTree::nearest_neighbors_with`].
/// Each call to `next` returns the `(distance, payload)` pair of the nearest point not
/// yet emitted, expanding only the subtrees whose bounding boxes could still contain a
/// better candidate.
#[derive(Debug)]
pub struct NearestNeighbors<'a, T, M: DistanceMetric> {
    tree: &'a KdTree<T>,
    search_point: Vec<f64>,
    metric: M,
    threshold: f64,
    k: usize,
    pending: MinHeap<&'a KdNode>,
    evaluated: IntervalHeap<usize>,
    remaining: usize,
    current_distance: f64,
}

impl<'a, T, M: DistanceMetric> NearestNeighbors<'a, T, M> {
    pub(crate) fn new(
        tree: &'a KdTree<T>,
        search_point: Vec<f64>,
        k: usize,
        threshold: f64,
        metric: M,
    ) -> Self {
        let budget = k.min(tree.root().size());
        let mut pending = MinHeap::new();
        pending.insert(0.0, tree.root());
        NearestNeighbors {
            tree,
            search_point,
            metric,
            threshold,
            k,
            pending,
            evaluated: IntervalHeap::with_capacity(budget),
            remaining: budget,
            current_distance: -1.0,
        }
    }

    /// Returns the distance of the most recently emitted payload, or a negative value
    /// if nothing has been emitted yet.
    pub fn current_distance(&self) -> f64 {
        self.current_distance
    }

    /// Returns the iterator to its initial state. The search point copy and the metric
    /// are kept; only the two queues are rewound.
    pub fn reset(&mut self) {
        let tree = self.tree;
        self.pending.clear();
        self.evaluated.clear();
        self.pending.insert(0.0, tree.root());
        self.remaining = self.k.min(tree.root().size());
        self.current_distance = -1.0;
    }

    // Pops pending subtrees while one of them could still hold a point closer than the
    // best unreturned candidate, descending each to its nearest leaf and enqueueing the
    // far children with their box-distance lower bounds.
    fn expand(&mut self) {
        while !self.pending.is_empty()
            && (self.evaluated.is_empty()
                || self.pending.min_key().unwrap() < self.evaluated.min_key().unwrap())
        {
            let mut node = self.pending.remove_min().unwrap();
            while !node.is_leaf() {
                let toward_right = self.search_point[node.split_dimension()] > node.split_value();
                let (near, far) = if toward_right {
                    (node.right().unwrap(), node.left().unwrap())
                } else {
                    (node.left().unwrap(), node.right().unwrap())
                };
                let (far_min, far_max) = far.bounds();
                let bound = self
                    .metric
                    .distance_to_box(&self.search_point, far_min, far_max);
                let over_threshold = self.threshold >= 0.0 && bound > self.threshold;
                if !over_threshold
                    && (self.evaluated.len() < self.remaining
                        || bound <= self.evaluated.max_key().unwrap())
                {
                    self.pending.insert(bound, far);
                }
                node = near;
            }
            if node.single_point() {
                self.evaluate_single_point_leaf(node);
            } else {
                self.evaluate_leaf(node);
            }
        }
    }

    fn evaluate_leaf(&mut self, node: &KdNode) {
        let tree = self.tree;
        let points = tree.points_array();
        for &index in node.slots() {
            let distance = self.metric.distance(&self.search_point, &points[index]);
            if self.threshold >= 0.0 && distance > self.threshold {
                continue;
            }
            if self.evaluated.len() < self.remaining {
                self.evaluated.insert(distance, index);
            } else if distance < self.evaluated.max_key().unwrap() {
                self.evaluated.replace_max(distance, index).unwrap();
            }
        }
    }

    // All points of a single-point leaf share one distance, so it is computed once and
    // admission is decided once for the whole bucket.
    fn evaluate_single_point_leaf(&mut self, node: &KdNode) {
        let slots = node.slots();
        if slots.is_empty() {
            return;
        }
        let tree = self.tree;
        let distance = self
            .metric
            .distance(&self.search_point, tree.point_slice(slots[0]));
        if self.threshold >= 0.0 && distance > self.threshold {
            return;
        }
        if self.evaluated.len() >= self.remaining
            && distance > self.evaluated.max_key().unwrap()
        {
            return;
        }
        for &index in slots {
            if self.evaluated.len() < self.remaining {
                self.evaluated.insert(distance, index);
            } else {
                self.evaluated.replace_max(distance, index).unwrap();
            }
        }
    }
}

impl<'a, T, M: DistanceMetric> Iterator for NearestNeighbors<'a, T, M> {
    type Item = (f64, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.expand();
        if self.evaluated.is_empty() {
            return None;
        }
        let tree = self.tree;
        let distance = self.evaluated.min_key().unwrap();
        let index = self.evaluated.remove_min().unwrap();
        self.current_distance = distance;
        self.remaining -= 1;
        Some((distance, tree.payload_ref(index)))
    }
}
