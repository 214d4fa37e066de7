//! Integration tests for approximate (IVF) search behavior.

use magnitude::cluster::KMeansTrainer;
use magnitude::error::MagnitudeError;
use magnitude::index::{Index, VectorIndex};
use magnitude::vector::{DistanceMetric, Vector};

/// Deterministic pseudo-random dataset shared by the equivalence tests.
fn dataset(count: usize, dimension: usize) -> Vec<Vector> {
    (0..count)
        .map(|i| {
            Vector::new(
                (0..dimension)
                    .map(|j| ((i * 31 + j * 7) as f32 * 0.37).sin())
                    .collect(),
            )
        })
        .collect()
}

#[test]
fn test_full_probe_matches_flat_exactly() {
    let vectors = dataset(80, 4);
    let nlist = 5;

    let mut flat = Index::new_flat(4, DistanceMetric::L2);
    let mut ivf = Index::new_ivf(4, DistanceMetric::L2);
    ivf.as_ivf_mut()
        .unwrap()
        .train(&vectors, nlist, 123)
        .unwrap();

    for vector in &vectors {
        flat.insert(vector.clone()).unwrap();
        ivf.insert(vector.clone()).unwrap();
    }

    // Probing every cluster scans every vector, so the approximation
    // disappears and results must match flat bit-for-bit.
    let queries = [
        [0.0f32, 0.0, 0.0, 0.0],
        [0.5, -0.5, 0.25, -0.25],
        [0.9, 0.9, 0.9, 0.9],
    ];
    for query in &queries {
        let exact = flat.search(query, 10).unwrap();
        let approx = ivf
            .as_ivf()
            .unwrap()
            .search_with_probes(query, 10, nlist)
            .unwrap();

        assert_eq!(exact.len(), approx.len());
        for (e, a) in exact.iter().zip(approx.iter()) {
            assert_eq!(e.id, a.id);
            assert_eq!(e.distance.to_bits(), a.distance.to_bits());
        }
    }
}

#[test]
fn test_full_probe_matches_flat_inner_product() {
    let vectors = dataset(60, 3);
    let nlist = 4;

    let mut flat = Index::new_flat(3, DistanceMetric::InnerProduct);
    let mut ivf = Index::new_ivf(3, DistanceMetric::InnerProduct);
    ivf.as_ivf_mut().unwrap().train(&vectors, nlist, 7).unwrap();

    for vector in &vectors {
        flat.insert(vector.clone()).unwrap();
        ivf.insert(vector.clone()).unwrap();
    }

    let exact = flat.search(&[0.3, 0.6, -0.2], 8).unwrap();
    let approx = ivf
        .as_ivf()
        .unwrap()
        .search_with_probes(&[0.3, 0.6, -0.2], 8, nlist)
        .unwrap();

    assert_eq!(exact.len(), approx.len());
    for (e, a) in exact.iter().zip(approx.iter()) {
        assert_eq!(e.id, a.id);
        assert_eq!(e.distance.to_bits(), a.distance.to_bits());
    }
}

#[test]
fn test_cluster_partitioning_of_separated_pairs() {
    let points = vec![
        Vector::new(vec![0.0, 0.0]),
        Vector::new(vec![0.1, 0.0]),
        Vector::new(vec![10.0, 10.0]),
        Vector::new(vec![10.0, 10.1]),
    ];

    let mut index = Index::new_ivf(2, DistanceMetric::L2);
    let ivf = index.as_ivf_mut().unwrap();
    ivf.train(&points, 2, 42).unwrap();
    for point in &points {
        ivf.insert(point.clone()).unwrap();
    }

    // Each inverted list holds exactly the pair nearest its centroid.
    let lists = ivf.inverted_lists();
    let mut sizes: Vec<usize> = lists.iter().map(|l| l.len()).collect();
    sizes.sort();
    assert_eq!(sizes, vec![2, 2]);
    for list in lists {
        let near = list.iter().filter(|&&id| id < 2).count();
        assert!(near == 0 || near == 2, "a true pair must not be split");
    }
}

#[test]
fn test_kmeans_reproducibility_across_runs() {
    let samples = dataset(100, 6);

    let first = KMeansTrainer::new(8, 2024).train(&samples).unwrap();
    let second = KMeansTrainer::new(8, 2024).train(&samples).unwrap();

    for (a, b) in first.iter().zip(second.iter()) {
        for (x, y) in a.data.iter().zip(b.data.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }
}

#[test]
fn test_lifecycle_errors() {
    let mut index = Index::new_ivf(2, DistanceMetric::L2);

    assert!(matches!(
        index.insert(Vector::new(vec![0.0, 0.0])),
        Err(MagnitudeError::NotTrained(_))
    ));
    assert!(matches!(
        index.search(&[0.0, 0.0], 1),
        Err(MagnitudeError::NotTrained(_))
    ));

    let samples = dataset(10, 2);
    index.as_ivf_mut().unwrap().train(&samples, 3, 1).unwrap();

    assert!(matches!(
        index.search(&[0.0, 0.0], 0),
        Err(MagnitudeError::InvalidArgument(_))
    ));
    assert!(matches!(
        index.as_ivf().unwrap().search_with_probes(&[0.0, 0.0], 1, 4),
        Err(MagnitudeError::InvalidArgument(_))
    ));

    // Trained but still empty: a valid search returns no hits.
    assert!(index.search(&[0.0, 0.0], 5).unwrap().is_empty());
}

#[test]
fn test_nprobe_increases_recall() {
    let vectors = dataset(120, 4);
    let nlist = 6;

    let mut flat = Index::new_flat(4, DistanceMetric::L2);
    let mut ivf = Index::new_ivf(4, DistanceMetric::L2);
    ivf.as_ivf_mut().unwrap().train(&vectors, nlist, 9).unwrap();

    for vector in &vectors {
        flat.insert(vector.clone()).unwrap();
        ivf.insert(vector.clone()).unwrap();
    }

    let query = [0.2f32, -0.1, 0.4, 0.0];
    let exact: Vec<u64> = flat
        .search(&query, 10)
        .unwrap()
        .iter()
        .map(|h| h.id)
        .collect();

    let recall_at = |nprobe: usize| -> usize {
        ivf.as_ivf()
            .unwrap()
            .search_with_probes(&query, 10, nprobe)
            .unwrap()
            .iter()
            .filter(|h| exact.contains(&h.id))
            .count()
    };

    // Recall never decreases as more clusters are probed, and probing all
    // of them recovers the exact result set.
    let mut previous = 0;
    for nprobe in 1..=nlist {
        let recall = recall_at(nprobe);
        assert!(recall >= previous);
        previous = recall;
    }
    assert_eq!(previous, 10);
}
