//! Integration tests for exact (flat) search behavior.

use magnitude::error::MagnitudeError;
use magnitude::index::{Index, VectorIndex};
use magnitude::vector::{DistanceMetric, Vector};

#[test]
fn test_self_query_returns_own_id() {
    let mut index = Index::new_flat(3, DistanceMetric::L2);
    let id = index.insert(Vector::new(vec![0.2, 0.4, 0.6])).unwrap();

    let hits = index.search(&[0.2, 0.4, 0.6], 1).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, id);
    assert_eq!(hits[0].distance, 0.0);
}

#[test]
fn test_unit_square_scenario() {
    // Three points, query at the origin: the two unit-distance points win
    // and tie-break by id, the corner point at squared distance 2 is
    // excluded.
    let mut index = Index::new_flat(2, DistanceMetric::L2);
    let a = index.insert(Vector::new(vec![1.0, 0.0])).unwrap();
    let b = index.insert(Vector::new(vec![0.0, 1.0])).unwrap();
    let c = index.insert(Vector::new(vec![1.0, 1.0])).unwrap();

    let hits = index.search(&[0.0, 0.0], 2).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!((hits[0].id, hits[0].distance), (a, 1.0));
    assert_eq!((hits[1].id, hits[1].distance), (b, 1.0));
    assert!(hits.iter().all(|h| h.id != c));
}

#[test]
fn test_results_are_ordered_and_bounded() {
    let mut index = Index::new_flat(1, DistanceMetric::L2);
    for i in 0..20 {
        index.insert(Vector::new(vec![i as f32])).unwrap();
    }

    for k in [1, 5, 20] {
        let hits = index.search(&[7.2], k).unwrap();
        assert_eq!(hits.len(), k);
        for pair in hits.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        assert_eq!(hits[0].id, 7);
    }

    // k above the stored count returns everything.
    let hits = index.search(&[7.2], 100).unwrap();
    assert_eq!(hits.len(), 20);
}

#[test]
fn test_inner_product_descends() {
    let mut index = Index::new_flat(2, DistanceMetric::InnerProduct);
    index.insert(Vector::new(vec![1.0, 0.0])).unwrap();
    index.insert(Vector::new(vec![2.0, 0.0])).unwrap();
    index.insert(Vector::new(vec![0.5, 0.0])).unwrap();

    let hits = index.search(&[1.0, 0.0], 3).unwrap();
    assert_eq!(hits[0].id, 1);
    assert_eq!(hits[0].distance, 2.0);
    assert_eq!(hits[1].id, 0);
    assert_eq!(hits[2].id, 2);
}

#[test]
fn test_invalid_queries() {
    let mut index = Index::new_flat(2, DistanceMetric::L2);
    index.insert(Vector::new(vec![1.0, 0.0])).unwrap();

    assert!(matches!(
        index.search(&[0.0, 0.0], 0),
        Err(MagnitudeError::InvalidArgument(_))
    ));
    assert!(matches!(
        index.search(&[0.0], 1),
        Err(MagnitudeError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_empty_index_search() {
    let index = Index::new_flat(2, DistanceMetric::L2);
    assert!(index.search(&[0.0, 0.0], 5).unwrap().is_empty());
}
