//! Vector primitives and the distance kernel.
//!
//! This module provides the two building blocks every index is made of:
//! - [`Vector`], a fixed-dimension dense `f32` vector
//! - [`DistanceMetric`], the kernel that scores a query against candidates
//!
//! The kernel is the single performance-critical inner loop of the crate.
//! It is SIMD-accelerated (8 lanes at a time) with scalar remainder
//! handling, and deterministic: the same inputs always produce bit-identical
//! outputs, which the search and persistence tests rely on.

pub mod store;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use wide::f32x8;

use crate::error::{MagnitudeError, Result};

/// A dense vector for similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    /// The vector components as floating point values.
    pub data: Vec<f32>,
}

impl Vector {
    /// Create a new vector with the given components.
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Get the dimensionality of this vector.
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Calculate the L2 norm (magnitude) of this vector.
    pub fn norm(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Normalize this vector to unit length. Zero vectors are left as-is.
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for value in &mut self.data {
                *value /= norm;
            }
        }
    }

    /// Get a normalized copy of this vector.
    pub fn normalized(&self) -> Self {
        let mut normalized = self.clone();
        normalized.normalize();
        normalized
    }

    /// Check that every component is finite (no NaN or infinity).
    pub fn is_valid(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Validate that this vector has the expected dimension.
    pub fn validate_dimension(&self, expected: usize) -> Result<()> {
        if self.data.len() != expected {
            return Err(MagnitudeError::dimension_mismatch(expected, self.data.len()));
        }
        Ok(())
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Vector::new(data)
    }
}

/// Distance metrics for vector similarity calculation.
///
/// Internally every metric is reduced to a single *score* where lower means
/// closer, so flat and IVF search can share one top-k ordering. The value
/// reported to callers is the raw metric: squared Euclidean distance for
/// [`DistanceMetric::L2`] (ascending = closer), the inner product itself for
/// [`DistanceMetric::InnerProduct`] (descending = closer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DistanceMetric {
    /// Squared Euclidean (L2) distance. Lower is more similar.
    #[default]
    L2,
    /// Inner product similarity. Higher is more similar.
    InnerProduct,
}

/// Candidate batches at or above this size may be scored with rayon.
const PARALLEL_BATCH_THRESHOLD: usize = 128;

impl DistanceMetric {
    /// Compute the lower-is-better score between two vectors.
    ///
    /// For `L2` this is the squared Euclidean distance; for `InnerProduct`
    /// it is the negated dot product. Fails with `DimensionMismatch` if the
    /// slices differ in length.
    pub fn score(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        if a.len() != b.len() {
            return Err(MagnitudeError::dimension_mismatch(a.len(), b.len()));
        }

        let score = match self {
            DistanceMetric::L2 => l2_squared_simd(a, b),
            DistanceMetric::InnerProduct => -dot_product_simd(a, b),
        };

        Ok(score)
    }

    /// Convert an internal score back to the metric's reported distance.
    pub fn reported_distance(&self, score: f32) -> f32 {
        match self {
            DistanceMetric::L2 => score,
            DistanceMetric::InnerProduct => -score,
        }
    }

    /// Score a query against a batch of candidate vectors.
    ///
    /// With `parallel` set and a large enough batch the candidates are
    /// scored on the rayon thread pool. Output values and their order are
    /// identical to the sequential path.
    pub fn batch_score(
        &self,
        query: &[f32],
        candidates: &[Vector],
        parallel: bool,
    ) -> Result<Vec<f32>> {
        if parallel && candidates.len() >= PARALLEL_BATCH_THRESHOLD {
            candidates
                .par_iter()
                .map(|v| self.score(query, &v.data))
                .collect()
        } else {
            candidates
                .iter()
                .map(|v| self.score(query, &v.data))
                .collect()
        }
    }

    /// Get the name of this distance metric.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::L2 => "l2",
            DistanceMetric::InnerProduct => "inner_product",
        }
    }

    /// Parse a distance metric from a string.
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            "inner_product" | "ip" | "dot" => Ok(DistanceMetric::InnerProduct),
            _ => Err(MagnitudeError::invalid_argument(format!(
                "Unknown distance metric: {s}"
            ))),
        }
    }
}

/// SIMD-accelerated squared Euclidean distance.
fn l2_squared_simd(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let chunks_a = a.chunks_exact(8);
    let chunks_b = b.chunks_exact(8);
    let remainder_a = chunks_a.remainder();
    let remainder_b = chunks_b.remainder();

    let mut sum_vec = f32x8::splat(0.0);
    for (chunk_a, chunk_b) in chunks_a.zip(chunks_b) {
        let vec_a = f32x8::new(chunk_a.try_into().unwrap());
        let vec_b = f32x8::new(chunk_b.try_into().unwrap());
        let diff = vec_a - vec_b;
        sum_vec += diff * diff;
    }

    let mut total = sum_vec.to_array().iter().sum::<f32>();
    total += remainder_a
        .iter()
        .zip(remainder_b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>();

    total
}

/// SIMD-accelerated dot product.
fn dot_product_simd(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let chunks_a = a.chunks_exact(8);
    let chunks_b = b.chunks_exact(8);
    let remainder_a = chunks_a.remainder();
    let remainder_b = chunks_b.remainder();

    let mut dot_vec = f32x8::splat(0.0);
    for (chunk_a, chunk_b) in chunks_a.zip(chunks_b) {
        let vec_a = f32x8::new(chunk_a.try_into().unwrap());
        let vec_b = f32x8::new(chunk_b.try_into().unwrap());
        dot_vec += vec_a * vec_b;
    }

    let mut total = dot_vec.to_array().iter().sum::<f32>();
    total += remainder_a
        .iter()
        .zip(remainder_b.iter())
        .map(|(x, y)| x * y)
        .sum::<f32>();

    total
}
