//! ## Custom Errors for Kdrift
//!
//! This module defines custom errors and exceptions that are used internally by Kdrift.

use std::error::Error;
use std::fmt;

/// Represents errors specific to invalid operations or parameters in Kdrift.
#[derive(Debug)]
pub enum KdriftError {
    /// Occurs when a point has a different number of dimensions than the tree.
    DimensionMismatch {
        /// The number of dimensions the tree was built with.
        expected: usize,
        /// The number of dimensions of the offending point.
        actual: usize,
    },
    /// Occurs when a stable index refers to a hole or lies outside the used range.
    IndexOutOfRange {
        /// The index that was requested.
        index: usize,
        /// The size of the used range.
        size: usize,
    },
    /// Occurs when a read or removal is attempted on an empty heap.
    EmptyCollection,
    /// Occurs when an invalid bucket capacity is provided.
    InvalidCapacity {
        /// The capacity value that was provided.
        capacity: usize,
    },
    /// Occurs when an invalid dimensionality is provided at construction.
    InvalidDimensionality {
        /// The dimensionality value that was provided.
        dimensions: usize,
    },
    /// Occurs when an operation is not supported by the tree.
    UnsupportedOperation {
        /// The name of the rejected operation.
        operation: &'static str,
    },
}

impl fmt::Display for KdriftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KdriftError::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "Dimension mismatch: expected a point with {expected} dimensions, got {actual}"
                )
            }
            KdriftError::IndexOutOfRange { index, size } => {
                write!(
                    f,
                    "Index out of range: {index} does not refer to a live point (used range is {size})"
                )
            }
            KdriftError::EmptyCollection => {
                write!(f, "Empty collection: the heap holds no elements")
            }
            KdriftError::InvalidCapacity { capacity } => {
                write!(
                    f,
                    "Invalid capacity: {capacity}. Bucket capacity must be greater than zero."
                )
            }
            KdriftError::InvalidDimensionality { dimensions } => {
                write!(
                    f,
                    "Invalid dimensionality: {dimensions} is not usable for this tree or metric"
                )
            }
            KdriftError::UnsupportedOperation { operation } => {
                write!(f, "Unsupported operation: {operation}")
            }
        }
    }
}

impl Error for KdriftError {}
