//! Weighted regulator × target adjacency matrix.

use arborix_common::{ArborixError, Result};
use serde::Serialize;

/// Rows are regulators, columns are targets, both indexed like the expression matrix.
///
/// Starts all-zero. Each target column is written at most once, by
/// [`AdjacencyMatrix::assemble`]; cells never written stay zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjacencyMatrix {
    genes: Vec<String>,
    /// Row-major `genes x genes`.
    weights: Vec<f64>,
    #[serde(skip)]
    assembled: Vec<bool>,
}

impl AdjacencyMatrix {
    pub fn new(genes: Vec<String>) -> Self {
        let n = genes.len();
        Self {
            genes,
            weights: vec![0.0; n * n],
            assembled: vec![false; n],
        }
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.genes
    }

    pub fn gene_index(&self, gene: &str) -> Option<usize> {
        self.genes.iter().position(|g| g == gene)
    }

    /// Weight of the link `regulator -> target`.
    #[inline]
    pub fn weight(&self, regulator: usize, target: usize) -> f64 {
        self.weights[regulator * self.genes.len() + target]
    }

    pub fn weight_by_id(&self, regulator: &str, target: &str) -> Option<f64> {
        Some(self.weight(self.gene_index(regulator)?, self.gene_index(target)?))
    }

    /// Outgoing weights of one regulator.
    pub fn row(&self, regulator: usize) -> &[f64] {
        let n = self.genes.len();
        &self.weights[regulator * n..(regulator + 1) * n]
    }

    /// Incoming weights of one target.
    pub fn column(&self, target: usize) -> Vec<f64> {
        (0..self.genes.len()).map(|r| self.weight(r, target)).collect()
    }

    pub fn column_sum(&self, target: usize) -> f64 {
        (0..self.genes.len()).map(|r| self.weight(r, target)).sum()
    }

    pub fn is_assembled(&self, target: usize) -> bool {
        self.assembled[target]
    }

    /// Row-major weights.
    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    /// Write the normalised importances of one task into its target column.
    pub fn assemble(&mut self, target: usize, predictors: &[usize], normalised: &[f64]) -> Result<()> {
        let n = self.genes.len();
        if target >= n {
            return Err(ArborixError::Assembly(format!("target index {target} out of range")));
        }
        if self.assembled[target] {
            return Err(ArborixError::Assembly(format!(
                "column {} already assembled",
                self.genes[target]
            )));
        }
        if predictors.len() != normalised.len() {
            return Err(ArborixError::Assembly(format!(
                "{} predictors but {} importances for target {}",
                predictors.len(),
                normalised.len(),
                self.genes[target]
            )));
        }
        for &r in predictors {
            if r >= n {
                return Err(ArborixError::Assembly(format!("regulator index {r} out of range")));
            }
            if r == target {
                return Err(ArborixError::Assembly(format!(
                    "self-link on {} is not allowed",
                    self.genes[target]
                )));
            }
        }

        for (&r, &w) in predictors.iter().zip(normalised.iter()) {
            self.weights[r * n + target] = w;
        }
        self.assembled[target] = true;
        Ok(())
    }
}
