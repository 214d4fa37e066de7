//! Contiguous storage of fixed-dimension vectors with stable identifiers.

use serde::{Deserialize, Serialize};

use crate::error::{MagnitudeError, Result};
use crate::vector::Vector;

/// Growable, append-only storage of fixed-dimension vectors.
///
/// Identifiers are assigned monotonically starting at zero, so an id doubles
/// as the vector's position in storage. The store performs no internal
/// locking; concurrent readers are safe, but writers must be externally
/// synchronized (single-writer, multiple-reader discipline).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStore {
    dimension: usize,
    vectors: Vec<Vector>,
}

impl VectorStore {
    /// Create a new empty store for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    /// Rebuild a store from decoded parts. The caller guarantees every
    /// vector already has the right dimension.
    pub(crate) fn from_parts(dimension: usize, vectors: Vec<Vector>) -> Self {
        Self { dimension, vectors }
    }

    /// The dimension every stored vector must have.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Append a vector and return its newly assigned identifier.
    ///
    /// Fails with `DimensionMismatch` if the vector has the wrong dimension
    /// and `InvalidArgument` if it contains NaN or infinite components. The
    /// store is unchanged on error.
    pub fn append(&mut self, vector: Vector) -> Result<u64> {
        self.validate(&vector)?;

        let id = self.vectors.len() as u64;
        self.vectors.push(vector);
        Ok(id)
    }

    /// Bulk-load a batch of vectors, returning their assigned identifiers.
    ///
    /// Atomic: every vector is validated before any is appended, so a
    /// failure leaves the store exactly as it was.
    pub fn extend(&mut self, vectors: Vec<Vector>) -> Result<Vec<u64>> {
        for vector in &vectors {
            self.validate(vector)?;
        }

        let first = self.vectors.len() as u64;
        let ids = (first..first + vectors.len() as u64).collect();
        self.vectors.extend(vectors);
        Ok(ids)
    }

    /// Random-access read by identifier.
    pub fn get(&self, id: u64) -> Result<&Vector> {
        self.vectors
            .get(id as usize)
            .ok_or_else(|| MagnitudeError::not_found(format!("vector id {id}")))
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Check whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// All stored vectors, in identifier order.
    pub fn vectors(&self) -> &[Vector] {
        &self.vectors
    }

    /// Iterate over `(id, vector)` pairs in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Vector)> {
        self.vectors.iter().enumerate().map(|(i, v)| (i as u64, v))
    }

    fn validate(&self, vector: &Vector) -> Result<()> {
        vector.validate_dimension(self.dimension)?;
        if !vector.is_valid() {
            return Err(MagnitudeError::invalid_argument(
                "vector contains NaN or infinite components",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_monotonic_ids() {
        let mut store = VectorStore::new(2);

        let a = store.append(Vector::new(vec![1.0, 0.0])).unwrap();
        let b = store.append(Vector::new(vec![0.0, 1.0])).unwrap();

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_append_dimension_mismatch() {
        let mut store = VectorStore::new(3);

        let result = store.append(Vector::new(vec![1.0, 2.0]));
        assert!(matches!(
            result,
            Err(MagnitudeError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_rejects_non_finite() {
        let mut store = VectorStore::new(2);

        let result = store.append(Vector::new(vec![1.0, f32::NAN]));
        assert!(matches!(result, Err(MagnitudeError::InvalidArgument(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_get() {
        let mut store = VectorStore::new(2);
        let id = store.append(Vector::new(vec![0.5, 0.25])).unwrap();

        assert_eq!(store.get(id).unwrap().data, vec![0.5, 0.25]);
        assert!(matches!(store.get(99), Err(MagnitudeError::NotFound(_))));
    }

    #[test]
    fn test_extend_is_atomic() {
        let mut store = VectorStore::new(2);
        store.append(Vector::new(vec![1.0, 1.0])).unwrap();

        let batch = vec![
            Vector::new(vec![2.0, 2.0]),
            Vector::new(vec![3.0]), // wrong dimension
        ];
        assert!(store.extend(batch).is_err());
        assert_eq!(store.len(), 1);

        let ids = store
            .extend(vec![Vector::new(vec![2.0, 2.0]), Vector::new(vec![3.0, 3.0])])
            .unwrap();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(store.len(), 3);
    }
}
