//! Flat index: exact nearest-neighbor search by exhaustive scan.

use crate::error::Result;
use crate::index::{IndexConfig, SearchHit, TopK, VectorIndex, validate_query};
use crate::vector::{Vector, store::VectorStore};

/// Exact nearest-neighbor index.
///
/// Every query scores every stored vector, so results are exact and cost
/// O(n·d) per query. This is the accuracy/latency baseline an [`IvfIndex`]
/// trades against: IVF answers faster by scanning fewer candidates, at the
/// price of possibly missing true neighbors.
///
/// [`IvfIndex`]: crate::index::IvfIndex
#[derive(Debug, Clone)]
pub struct FlatIndex {
    config: IndexConfig,
    store: VectorStore,
}

impl FlatIndex {
    /// Create an empty flat index. No training is required.
    pub fn new(config: IndexConfig) -> Self {
        let store = VectorStore::new(config.dimension);
        Self { config, store }
    }

    /// Rebuild a flat index from persisted parts.
    pub(crate) fn from_parts(config: IndexConfig, store: VectorStore) -> Self {
        Self { config, store }
    }

    /// The backing vector store.
    pub fn store(&self) -> &VectorStore {
        &self.store
    }
}

impl VectorIndex for FlatIndex {
    fn insert(&mut self, vector: Vector) -> Result<u64> {
        self.store.append(vector)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        validate_query(&self.config, query, k)?;

        let scores =
            self.config
                .metric
                .batch_score(query, self.store.vectors(), self.config.parallel)?;

        let mut topk = TopK::new(k);
        for (id, score) in scores.into_iter().enumerate() {
            topk.push(id as u64, score);
        }

        Ok(topk.into_hits(self.config.metric))
    }

    fn len(&self) -> usize {
        self.store.len()
    }

    fn config(&self) -> &IndexConfig {
        &self.config
    }
}
