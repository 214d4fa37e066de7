//! IVF index: approximate search via inverted-file cluster pruning.

use crate::cluster::KMeansTrainer;
use crate::error::{MagnitudeError, Result};
use crate::index::{IndexConfig, SearchHit, TopK, VectorIndex, validate_query};
use crate::vector::{Vector, store::VectorStore};

/// Approximate nearest-neighbor index backed by an inverted file.
///
/// Training partitions the vector space into `nlist` clusters with k-means;
/// each stored vector is assigned to the inverted list of its nearest
/// centroid. A query scores only the centroids, picks the `nprobe` nearest,
/// and scans just those clusters' lists.
///
/// `nprobe` is the recall/latency knob: 1 (the default) scans a single
/// cluster and is fastest; `nprobe == nlist` scans everything and returns
/// exactly what a [`FlatIndex`] would. Approximation comes only from
/// limiting `nprobe`.
///
/// Lifecycle: an index starts untrained; `insert` and `search` fail with
/// `NotTrained` until [`IvfIndex::train`] succeeds. Retraining replaces the
/// centroids and rebuilds every inverted list from the stored vectors.
///
/// [`FlatIndex`]: crate::index::FlatIndex
#[derive(Debug, Clone)]
pub struct IvfIndex {
    config: IndexConfig,
    store: VectorStore,
    centroids: Vec<Vector>,
    inverted_lists: Vec<Vec<u64>>,
    nprobe: usize,
    trained: bool,
}

impl IvfIndex {
    /// Create an empty, untrained IVF index.
    pub fn new(config: IndexConfig) -> Self {
        let store = VectorStore::new(config.dimension);
        Self {
            config,
            store,
            centroids: Vec::new(),
            inverted_lists: Vec::new(),
            nprobe: 1,
            trained: false,
        }
    }

    /// Rebuild an IVF index from persisted parts.
    pub(crate) fn from_parts(
        config: IndexConfig,
        store: VectorStore,
        centroids: Vec<Vector>,
        inverted_lists: Vec<Vec<u64>>,
        nprobe: usize,
        trained: bool,
    ) -> Self {
        Self {
            config,
            store,
            centroids,
            inverted_lists,
            nprobe,
            trained,
        }
    }

    /// Train the cluster partitioning from a set of sample vectors.
    ///
    /// Runs seeded k-means (see [`KMeansTrainer`]) over `samples`, then
    /// commits the resulting centroids, allocates `nlist` inverted lists,
    /// and re-assigns any vectors already stored, so retraining clears and
    /// rebuilds the lists. Atomic: on error the index is left exactly as it
    /// was.
    pub fn train(&mut self, samples: &[Vector], nlist: usize, seed: u64) -> Result<()> {
        for sample in samples {
            sample.validate_dimension(self.config.dimension)?;
        }

        let centroids = KMeansTrainer::new(nlist, seed)
            .with_metric(self.config.metric)
            .train(samples)?;

        let mut inverted_lists = vec![Vec::new(); nlist];
        for (id, vector) in self.store.iter() {
            let cluster = nearest_centroid(&self.config, &centroids, &vector.data)?;
            inverted_lists[cluster].push(id);
        }

        self.centroids = centroids;
        self.inverted_lists = inverted_lists;
        self.nprobe = self.nprobe.clamp(1, nlist);
        self.trained = true;
        Ok(())
    }

    /// Search with an explicit probe count instead of the configured default.
    pub fn search_with_probes(
        &self,
        query: &[f32],
        k: usize,
        nprobe: usize,
    ) -> Result<Vec<SearchHit>> {
        if !self.trained {
            return Err(MagnitudeError::not_trained(
                "search requires a trained IVF index",
            ));
        }
        validate_query(&self.config, query, k)?;
        if nprobe == 0 || nprobe > self.nlist() {
            return Err(MagnitudeError::invalid_argument(format!(
                "nprobe must be in 1..={}, got {nprobe}",
                self.nlist()
            )));
        }

        // Rank centroids, keep the nprobe nearest.
        let centroid_scores =
            self.config
                .metric
                .batch_score(query, &self.centroids, self.config.parallel)?;
        let mut probe_ranking = TopK::new(nprobe);
        for (cluster, score) in centroid_scores.into_iter().enumerate() {
            probe_ranking.push(cluster as u64, score);
        }

        // Scan only the probed clusters' lists.
        let mut topk = TopK::new(k);
        for probe in probe_ranking.into_hits(self.config.metric) {
            for &id in &self.inverted_lists[probe.id as usize] {
                let vector = self.store.get(id)?;
                let score = self.config.metric.score(query, &vector.data)?;
                topk.push(id, score);
            }
        }

        Ok(topk.into_hits(self.config.metric))
    }

    /// Set the default number of clusters probed per query.
    pub fn set_nprobe(&mut self, nprobe: usize) -> Result<()> {
        if !self.trained {
            return Err(MagnitudeError::not_trained(
                "nprobe can only be set on a trained index",
            ));
        }
        if nprobe == 0 || nprobe > self.nlist() {
            return Err(MagnitudeError::invalid_argument(format!(
                "nprobe must be in 1..={}, got {nprobe}",
                self.nlist()
            )));
        }
        self.nprobe = nprobe;
        Ok(())
    }

    /// The default probe count used by [`VectorIndex::search`].
    pub fn nprobe(&self) -> usize {
        self.nprobe
    }

    /// Number of clusters, zero before training.
    pub fn nlist(&self) -> usize {
        self.centroids.len()
    }

    /// Whether the index has been trained.
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Centroids produced by the most recent training.
    pub fn centroids(&self) -> &[Vector] {
        &self.centroids
    }

    /// Per-cluster inverted lists of vector identifiers.
    pub fn inverted_lists(&self) -> &[Vec<u64>] {
        &self.inverted_lists
    }

    /// The backing vector store.
    pub fn store(&self) -> &VectorStore {
        &self.store
    }
}

impl VectorIndex for IvfIndex {
    fn insert(&mut self, vector: Vector) -> Result<u64> {
        if !self.trained {
            return Err(MagnitudeError::not_trained(
                "insert requires a trained IVF index",
            ));
        }

        // Pick the cluster before appending so a rejected vector leaves the
        // index untouched.
        vector.validate_dimension(self.config.dimension)?;
        let cluster = nearest_centroid(&self.config, &self.centroids, &vector.data)?;
        let id = self.store.append(vector)?;
        self.inverted_lists[cluster].push(id);
        Ok(id)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.search_with_probes(query, k, self.nprobe)
    }

    fn len(&self) -> usize {
        self.store.len()
    }

    fn config(&self) -> &IndexConfig {
        &self.config
    }
}

/// Index of the centroid nearest to `data`, lowest index winning ties.
fn nearest_centroid(config: &IndexConfig, centroids: &[Vector], data: &[f32]) -> Result<usize> {
    let mut best_cluster = 0;
    let mut best_score = f32::INFINITY;

    for (i, centroid) in centroids.iter().enumerate() {
        let score = config.metric.score(data, &centroid.data)?;
        if score < best_score {
            best_score = score;
            best_cluster = i;
        }
    }

    Ok(best_cluster)
}
