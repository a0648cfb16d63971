//! arborix-ranker — Regulatory link ranking.
//!
//! Flattens an [`AdjacencyMatrix`](arborix_infer::AdjacencyMatrix) into a
//! list of directed links sorted by confidence.

pub mod links;

pub use links::{rank, Link, LinkList};
