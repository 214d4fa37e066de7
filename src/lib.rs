//! # Magnitude
//!
//! An embeddable vector similarity search engine for Rust.
//!
//! ## Features
//!
//! - Pure Rust implementation
//! - Exact (flat) and approximate (IVF) nearest-neighbor indexes
//! - L2 and inner-product metrics with a SIMD distance kernel
//! - Seeded, reproducible k-means training for IVF partitioning
//! - Versioned, checksummed binary persistence
//!
//! ## Example
//!
//! ```
//! use magnitude::index::{Index, VectorIndex};
//! use magnitude::vector::{DistanceMetric, Vector};
//!
//! let mut index = Index::new_flat(2, DistanceMetric::L2);
//! index.insert(Vector::new(vec![1.0, 0.0])).unwrap();
//! index.insert(Vector::new(vec![0.0, 1.0])).unwrap();
//!
//! let hits = index.search(&[0.9, 0.1], 1).unwrap();
//! assert_eq!(hits[0].id, 0);
//! ```
//!
//! ## Concurrency
//!
//! Queries take `&self` and are safe to run from many threads against a
//! trained index; `insert` and `train` take `&mut self`. The crate performs
//! no internal locking; embeddings that share an index across threads are
//! responsible for single-writer, multiple-reader synchronization.

pub mod cluster;
pub mod codec;
pub mod error;
pub mod index;
pub mod vector;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
