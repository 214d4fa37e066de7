//! K-means training for IVF partitioning.

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::error::{MagnitudeError, Result};
use crate::vector::{DistanceMetric, Vector};

/// Iterative k-means centroid trainer.
///
/// Initialization is k-means++: the first centroid is drawn uniformly from
/// the samples, each subsequent centroid with probability proportional to
/// its squared distance from the nearest centroid chosen so far. This gives
/// better-separated initial centroids than uniform sampling at the cost of
/// one extra pass per centroid.
///
/// The seed is a required constructor parameter, not an option: training
/// with the same seed on the same samples is reproducible run-to-run, which
/// the IVF tests depend on.
pub struct KMeansTrainer {
    nlist: usize,
    seed: u64,
    metric: DistanceMetric,
    max_iterations: usize,
    epsilon: f32,
}

impl KMeansTrainer {
    /// Create a trainer that produces `nlist` centroids.
    pub fn new(nlist: usize, seed: u64) -> Self {
        Self {
            nlist,
            seed,
            metric: DistanceMetric::L2,
            max_iterations: 100,
            epsilon: 1e-6,
        }
    }

    /// Set the metric used for sample-to-centroid assignment.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the maximum number of refinement iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the mean-centroid-movement threshold below which training stops.
    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Train centroids from the given samples.
    ///
    /// Fails with `InvalidArgument` if `nlist` is zero or there are fewer
    /// samples than requested centroids, and with `DimensionMismatch` if the
    /// samples disagree on dimension.
    pub fn train(&self, samples: &[Vector]) -> Result<Vec<Vector>> {
        if self.nlist == 0 {
            return Err(MagnitudeError::invalid_argument(
                "nlist must be greater than zero",
            ));
        }
        if samples.len() < self.nlist {
            return Err(MagnitudeError::invalid_argument(format!(
                "cannot form {} clusters from {} samples",
                self.nlist,
                samples.len()
            )));
        }

        let dimension = samples[0].dimension();
        for sample in samples {
            sample.validate_dimension(dimension)?;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = self.init_centroids(samples, &mut rng)?;

        for _ in 0..self.max_iterations {
            let assignments = self.assign(samples, &centroids)?;
            let new_centroids =
                self.update_centroids(samples, &assignments, dimension, &mut rng);

            let movement = self.mean_movement(&centroids, &new_centroids)?;
            centroids = new_centroids;

            if movement < self.epsilon {
                break;
            }
        }

        Ok(centroids)
    }

    /// K-means++ initialization with the trainer's seeded rng.
    fn init_centroids(&self, samples: &[Vector], rng: &mut StdRng) -> Result<Vec<Vector>> {
        let mut centroids = Vec::with_capacity(self.nlist);

        let first = rng.random_range(0..samples.len());
        centroids.push(samples[first].clone());

        while centroids.len() < self.nlist {
            // Weight each sample by its squared L2 distance to the nearest
            // chosen centroid.
            let mut weights = Vec::with_capacity(samples.len());
            let mut total_weight = 0.0f32;

            for sample in samples {
                let mut nearest = f32::INFINITY;
                for centroid in &centroids {
                    let d = DistanceMetric::L2.score(&sample.data, &centroid.data)?;
                    if d < nearest {
                        nearest = d;
                    }
                }
                weights.push(nearest);
                total_weight += nearest;
            }

            if total_weight <= 0.0 {
                // Every sample coincides with a centroid; fall back to a
                // uniform draw.
                let idx = rng.random_range(0..samples.len());
                centroids.push(samples[idx].clone());
                continue;
            }

            let target = rng.random::<f32>() * total_weight;
            let mut cumulative = 0.0f32;
            let mut chosen = samples.len() - 1;
            for (i, &weight) in weights.iter().enumerate() {
                cumulative += weight;
                if cumulative >= target {
                    chosen = i;
                    break;
                }
            }
            centroids.push(samples[chosen].clone());
        }

        Ok(centroids)
    }

    /// Assign each sample to its nearest centroid, lowest index winning ties.
    fn assign(&self, samples: &[Vector], centroids: &[Vector]) -> Result<Vec<usize>> {
        let mut assignments = Vec::with_capacity(samples.len());

        for sample in samples {
            let mut best_cluster = 0;
            let mut best_score = f32::INFINITY;
            for (i, centroid) in centroids.iter().enumerate() {
                let score = self.metric.score(&sample.data, &centroid.data)?;
                if score < best_score {
                    best_score = score;
                    best_cluster = i;
                }
            }
            assignments.push(best_cluster);
        }

        Ok(assignments)
    }

    /// Recompute centroids as component-wise means of their assigned samples.
    ///
    /// A centroid left with no assigned samples is re-seeded from a randomly
    /// drawn sample so clusters never collapse to fewer than `nlist`.
    fn update_centroids(
        &self,
        samples: &[Vector],
        assignments: &[usize],
        dimension: usize,
        rng: &mut StdRng,
    ) -> Vec<Vector> {
        let mut sums = vec![vec![0.0f32; dimension]; self.nlist];
        let mut counts = vec![0usize; self.nlist];

        for (sample, &cluster) in samples.iter().zip(assignments.iter()) {
            counts[cluster] += 1;
            for (acc, &value) in sums[cluster].iter_mut().zip(sample.data.iter()) {
                *acc += value;
            }
        }

        sums.into_iter()
            .zip(counts)
            .map(|(sum, count)| {
                if count == 0 {
                    let idx = rng.random_range(0..samples.len());
                    samples[idx].clone()
                } else {
                    Vector::new(sum.into_iter().map(|s| s / count as f32).collect())
                }
            })
            .collect()
    }

    /// Mean squared movement between two centroid generations.
    fn mean_movement(&self, old: &[Vector], new: &[Vector]) -> Result<f32> {
        let mut total = 0.0f32;
        for (a, b) in old.iter().zip(new.iter()) {
            total += DistanceMetric::L2.score(&a.data, &b.data)?;
        }
        Ok(total / old.len() as f32)
    }
}
