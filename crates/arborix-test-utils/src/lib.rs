//! Shared testing utilities for the Arborix workspace.
//!
//! Synthetic expression data with a known regulatory structure, plus a few
//! assertion helpers.

use arborix_expression::ExpressionMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub use pretty_assertions;

/// `G1`, `G2`, ... `Gn`.
pub fn gene_names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("G{i}")).collect()
}

/// Expression rows for a regulatory chain `G1 -> G2 -> ... -> Gn`.
///
/// `G1` is uniform noise; every later gene is `2 * previous + noise`, with
/// noise amplitude well below the signal. Same seed → same data.
pub fn chain_expression(n_genes: usize, n_samples: usize, seed: u64) -> (Vec<String>, Vec<Vec<f64>>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(n_genes);
    for g in 0..n_genes {
        let row = (0..n_samples)
            .map(|s| {
                let noise: f64 = rng.gen_range(-0.1..0.1);
                match g {
                    0 => rng.gen_range(0.0..10.0),
                    _ => 2.0 * rows[g - 1][s] + noise,
                }
            })
            .collect();
        rows.push(row);
    }
    (gene_names(n_genes), rows)
}

/// [`chain_expression`] as a validated matrix.
pub fn chain_matrix(n_genes: usize, n_samples: usize, seed: u64) -> ExpressionMatrix {
    let (genes, rows) = chain_expression(n_genes, n_samples, seed);
    ExpressionMatrix::new(genes, None, rows).expect("synthetic matrix is valid")
}

/// Build a matrix from literal rows with gene ids `G1..Gn`.
pub fn matrix_from_rows(rows: Vec<Vec<f64>>) -> ExpressionMatrix {
    ExpressionMatrix::new(gene_names(rows.len()), None, rows).expect("literal matrix is valid")
}

/// Assert `|a - b| <= tol`.
#[track_caller]
pub fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "expected {a} ≈ {b} (tolerance {tol})");
}
