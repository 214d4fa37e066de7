//! Vector index implementations and their shared query surface.
//!
//! Two index variants sit behind one insert/search interface:
//! - [`FlatIndex`]: exact brute-force search, the accuracy baseline
//! - [`IvfIndex`]: approximate search via inverted-file cluster pruning
//!
//! [`Index`] is the tagged variant unifying the two, and what the codec
//! persists. [`VectorIndex`] is the shared capability trait for callers that
//! want to be generic over the variant.

pub mod flat;
pub mod ivf;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::error::{MagnitudeError, Result};
use crate::vector::{DistanceMetric, Vector};

pub use flat::FlatIndex;
pub use ivf::IvfIndex;

/// Configuration shared by every index variant.
///
/// This is an explicit, per-index object rather than process-wide state:
/// two indexes in the same process can use different metrics and different
/// parallelism settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Dimension every indexed vector must have.
    pub dimension: usize,
    /// Metric used for scoring and ordering results.
    pub metric: DistanceMetric,
    /// Whether large candidate batches may be scored on the rayon pool.
    /// Never changes result values or order.
    pub parallel: bool,
}

impl IndexConfig {
    /// Create a configuration with parallel scoring disabled.
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            dimension,
            metric,
            parallel: false,
        }
    }

    /// Enable or disable parallel batch scoring.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// A single search result: an identifier and its distance to the query.
///
/// `distance` carries the raw metric value: squared Euclidean distance for
/// L2 (results ascend), the inner product for the inner-product metric
/// (results descend).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Identifier of the matched vector.
    pub id: u64,
    /// Metric value between the query and the matched vector.
    pub distance: f32,
}

/// Capability trait shared by all index variants.
pub trait VectorIndex {
    /// Insert a vector, returning its assigned identifier.
    fn insert(&mut self, vector: Vector) -> Result<u64>;

    /// Find the `k` nearest stored vectors to `query`.
    ///
    /// Results are ordered closest-first, with distance ties broken by
    /// ascending identifier, and contain at most `k` hits.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    /// Check whether the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The index configuration.
    fn config(&self) -> &IndexConfig;
}

/// Tagged union of the index variants, the handle application code holds.
#[derive(Debug, Clone)]
pub enum Index {
    /// Exact brute-force index.
    Flat(FlatIndex),
    /// Approximate inverted-file index.
    Ivf(IvfIndex),
}

impl Index {
    /// Create a new flat (exact) index.
    pub fn new_flat(dimension: usize, metric: DistanceMetric) -> Self {
        Index::Flat(FlatIndex::new(IndexConfig::new(dimension, metric)))
    }

    /// Create a new, untrained IVF (approximate) index.
    pub fn new_ivf(dimension: usize, metric: DistanceMetric) -> Self {
        Index::Ivf(IvfIndex::new(IndexConfig::new(dimension, metric)))
    }

    /// Borrow the IVF variant, if this is one.
    pub fn as_ivf(&self) -> Option<&IvfIndex> {
        match self {
            Index::Ivf(ivf) => Some(ivf),
            Index::Flat(_) => None,
        }
    }

    /// Mutably borrow the IVF variant, if this is one.
    pub fn as_ivf_mut(&mut self) -> Option<&mut IvfIndex> {
        match self {
            Index::Ivf(ivf) => Some(ivf),
            Index::Flat(_) => None,
        }
    }

    /// Borrow the flat variant, if this is one.
    pub fn as_flat(&self) -> Option<&FlatIndex> {
        match self {
            Index::Flat(flat) => Some(flat),
            Index::Ivf(_) => None,
        }
    }
}

impl VectorIndex for Index {
    fn insert(&mut self, vector: Vector) -> Result<u64> {
        match self {
            Index::Flat(flat) => flat.insert(vector),
            Index::Ivf(ivf) => ivf.insert(vector),
        }
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        match self {
            Index::Flat(flat) => flat.search(query, k),
            Index::Ivf(ivf) => ivf.search(query, k),
        }
    }

    fn len(&self) -> usize {
        match self {
            Index::Flat(flat) => flat.len(),
            Index::Ivf(ivf) => ivf.len(),
        }
    }

    fn config(&self) -> &IndexConfig {
        match self {
            Index::Flat(flat) => flat.config(),
            Index::Ivf(ivf) => ivf.config(),
        }
    }
}

/// Validate the query vector and `k` before any scan work.
pub(crate) fn validate_query(config: &IndexConfig, query: &[f32], k: usize) -> Result<()> {
    if k == 0 {
        return Err(MagnitudeError::invalid_argument(
            "k must be greater than zero",
        ));
    }
    if query.len() != config.dimension {
        return Err(MagnitudeError::dimension_mismatch(
            config.dimension,
            query.len(),
        ));
    }
    if !query.iter().all(|x| x.is_finite()) {
        return Err(MagnitudeError::invalid_argument(
            "query contains NaN or infinite components",
        ));
    }
    Ok(())
}

/// A scored candidate in the top-k heap.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    score: f32,
    id: u64,
}

// Scores are always finite here: stored vectors and queries are validated
// before scoring.
impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded top-k collector over `(score, id)` candidates.
///
/// Backed by a max-heap holding the k best seen so far, with the worst at
/// the top. The replacement comparison is `(score, id)` lexicographic, so a
/// candidate tying the current worst on score but carrying a lower id still
/// displaces it, so the final ordering is independent of scan order.
pub(crate) struct TopK {
    k: usize,
    heap: BinaryHeap<Candidate>,
}

impl TopK {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    pub(crate) fn push(&mut self, id: u64, score: f32) {
        let candidate = Candidate { score, id };

        if self.heap.len() < self.k {
            self.heap.push(candidate);
        } else if let Some(worst) = self.heap.peek()
            && candidate < *worst
        {
            self.heap.pop();
            self.heap.push(candidate);
        }
    }

    /// Drain into hits ordered closest-first, ties by ascending id.
    pub(crate) fn into_hits(self, metric: DistanceMetric) -> Vec<SearchHit> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|candidate| SearchHit {
                id: candidate.id,
                distance: metric.reported_distance(candidate.score),
            })
            .collect()
    }
}
