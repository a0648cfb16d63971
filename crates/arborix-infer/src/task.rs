//! Regression task construction.
//! One task per target gene: predict the target from every candidate regulator except itself.

use arborix_common::{ArborixError, KSpec, Result};
use arborix_expression::ExpressionMatrix;

/// A single supervised-learning problem, discarded once its column is assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTask {
    /// Target gene identifier.
    pub target: String,
    /// Row of the target in the expression matrix.
    pub target_index: usize,
    /// Predictor rows, in expression-matrix row order.
    pub predictors: Vec<usize>,
    pub n_samples: usize,
    /// Candidate features per split.
    pub mtry: usize,
}

impl RegressionTask {
    pub fn n_predictors(&self) -> usize {
        self.predictors.len()
    }

    pub fn predictor_ids<'m>(&self, matrix: &'m ExpressionMatrix) -> Vec<&'m str> {
        self.predictors.iter().map(|&row| matrix.gene_id(row)).collect()
    }

    /// Row-major `samples x predictors` table and the response vector.
    pub fn design(&self, matrix: &ExpressionMatrix) -> (Vec<f64>, Vec<f64>) {
        let p = self.predictors.len();
        let mut table = vec![0.0; self.n_samples * p];
        for (j, &row) in self.predictors.iter().enumerate() {
            for (s, &v) in matrix.gene_row(row).iter().enumerate() {
                table[s * p + j] = v;
            }
        }
        (table, matrix.gene_row(self.target_index).to_vec())
    }
}

/// Build the regression task of `target_gene`.
///
/// `candidate_regulators` are expression-matrix rows; the target is always
/// removed from its own predictor set.
pub fn build_task(
    matrix: &ExpressionMatrix,
    target_gene: &str,
    candidate_regulators: &[usize],
    k: KSpec,
) -> Result<RegressionTask> {
    let target_index = matrix
        .gene_index(target_gene)
        .ok_or_else(|| ArborixError::InvalidTarget(target_gene.to_string()))?;

    if let Some(&bad) = candidate_regulators.iter().find(|&&r| r >= matrix.n_genes()) {
        return Err(ArborixError::UnknownGene {
            param: "candidate_regulators".to_string(),
            gene: format!("index {bad} (matrix has {} genes)", matrix.n_genes()),
        });
    }

    let mut predictors: Vec<usize> = candidate_regulators
        .iter()
        .copied()
        .filter(|&r| r != target_index)
        .collect();
    predictors.sort_unstable();
    predictors.dedup();

    if predictors.is_empty() {
        return Err(ArborixError::EmptyPredictorSet(target_gene.to_string()));
    }

    let mtry = k.resolve(predictors.len());
    Ok(RegressionTask {
        target: target_gene.to_string(),
        target_index,
        predictors,
        n_samples: matrix.n_samples(),
        mtry,
    })
}

/// Build one task per target row, in the given order. The first failure aborts.
pub fn build_tasks(
    matrix: &ExpressionMatrix,
    targets: &[usize],
    candidate_regulators: &[usize],
    k: KSpec,
) -> Result<Vec<RegressionTask>> {
    targets
        .iter()
        .map(|&t| build_task(matrix, matrix.gene_id(t), candidate_regulators, k))
        .collect()
}
