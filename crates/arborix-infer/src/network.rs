//! Network inference entry point.
//!
//! Validation happens up front: configuration, gene selections and every
//! regression task are checked before the first tree is grown.

use std::time::Instant;

use arborix_common::{ArborixError, InferenceConfig, Result, TreeMethod};
use arborix_expression::ExpressionMatrix;
use arborix_forest::{EnsembleTrainer, RegressionProblem, TrainerParams, TreeEnsembleTrainer};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::adjacency::AdjacencyMatrix;
use crate::normalise::normalise_importances;
use crate::scheduler::Scheduler;
use crate::task::{build_tasks, RegressionTask};

/// Metadata of one inference run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Seed every task stream was derived from; drawn at random when none was configured.
    pub base_seed: u64,
    pub seeded: bool,
    pub tree_method: TreeMethod,
    pub num_trees: usize,
    pub parallelism: usize,
    pub num_tasks: usize,
    /// Targets whose predictors all had zero importance.
    pub num_zero_columns: usize,
}

/// Result of [`infer_network`].
#[derive(Debug, Clone)]
pub struct NetworkInference {
    pub matrix: AdjacencyMatrix,
    pub report: RunReport,
}

/// Infer a weighted regulatory network with the bundled tree ensemble.
pub fn infer_network(matrix: &ExpressionMatrix, config: &InferenceConfig) -> Result<NetworkInference> {
    infer_network_with(matrix, config, &TreeEnsembleTrainer::new())
}

/// Infer a weighted regulatory network with any [`EnsembleTrainer`].
pub fn infer_network_with(
    matrix: &ExpressionMatrix,
    config: &InferenceConfig,
    trainer: &dyn EnsembleTrainer,
) -> Result<NetworkInference> {
    config.validate()?;
    let regulators = matrix.resolve(config.candidate_regulators.as_ref(), "candidate_regulators")?;
    let targets = matrix.resolve(config.targets.as_ref(), "targets")?;
    let tasks = build_tasks(matrix, &targets, &regulators, config.k)?;

    let base_seed = match config.seed {
        Some(seed) => seed,
        None => {
            let seed = rand::random::<u64>();
            warn!("No seed configured; results are not reproducible unless base seed {seed} is reused");
            seed
        }
    };

    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let clock = Instant::now();
    info!(
        %run_id,
        genes = matrix.n_genes(),
        samples = matrix.n_samples(),
        regulators = regulators.len(),
        targets = tasks.len(),
        method = %config.tree_method,
        trees = config.num_trees,
        workers = config.parallelism,
        "Inferring regulatory network"
    );

    let data = if config.standardize { matrix.standardized() } else { matrix.clone() };
    let base_params = TrainerParams::new(config.tree_method, config.num_trees, 1)
        .with_min_leaf_size(config.min_leaf_size)
        .with_permutation_importance(config.permutation_importance);

    let scheduler = Scheduler::new(config.parallelism, base_seed);
    let columns = scheduler.run(&tasks, |task, rng| {
        let (table, response) = task.design(&data);
        let problem = RegressionProblem::new(task.n_samples, task.n_predictors(), &table, &response);
        let params = TrainerParams { mtry: task.mtry, ..base_params.clone() };
        let raw = trainer.importances(&problem, &params, rng)?;
        check_importances(&raw, task)?;
        Ok(normalise_importances(&raw))
    })?;

    let mut adjacency = AdjacencyMatrix::new(matrix.gene_ids().to_vec());
    let mut num_zero_columns = 0;
    for task in &tasks {
        let weights = columns
            .get(&task.target)
            .ok_or_else(|| ArborixError::Assembly(format!("no result for target {}", task.target)))?;
        if weights.iter().all(|&w| w == 0.0) {
            warn!(target_gene = %task.target, "All raw importances are zero; column left empty");
            num_zero_columns += 1;
        }
        adjacency.assemble(task.target_index, &task.predictors, weights)?;
    }

    let report = RunReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        base_seed: scheduler.base_seed(),
        seeded: config.seed.is_some(),
        tree_method: config.tree_method,
        num_trees: config.num_trees,
        parallelism: scheduler.parallelism(),
        num_tasks: tasks.len(),
        num_zero_columns,
    };
    info!(
        %run_id,
        tasks = report.num_tasks,
        zero_columns = num_zero_columns,
        elapsed_ms = clock.elapsed().as_millis() as u64,
        "Network inference finished"
    );

    Ok(NetworkInference { matrix: adjacency, report })
}

/// Enforce the trainer contract: one finite, non-negative value per predictor.
fn check_importances(raw: &[f64], task: &RegressionTask) -> Result<()> {
    if raw.len() != task.n_predictors() {
        return Err(ArborixError::Trainer(format!(
            "returned {} importances for {} predictors",
            raw.len(),
            task.n_predictors()
        )));
    }
    if let Some(v) = raw.iter().find(|v| !v.is_finite() || **v < 0.0) {
        return Err(ArborixError::Trainer(format!("invalid importance value {v}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arborix_common::GeneSelector;
    use arborix_forest::MockTrainer;

    fn matrix() -> ExpressionMatrix {
        let genes = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let rows = vec![
            vec![1.0, 2.0, 3.0, 4.0],
            vec![2.0, 1.0, 4.0, 3.0],
            vec![0.5, 0.9, 0.1, 0.3],
        ];
        ExpressionMatrix::new(genes, None, rows).unwrap()
    }

    fn seeded() -> InferenceConfig {
        InferenceConfig { seed: Some(1), num_trees: 10, ..Default::default() }
    }

    #[test]
    fn test_uniform_mock_spreads_weight_evenly() {
        let result = infer_network_with(&matrix(), &seeded(), &MockTrainer::constant(3.0)).unwrap();
        let m = &result.matrix;
        for t in 0..3 {
            assert_eq!(m.weight(t, t), 0.0);
            assert!((m.column_sum(t) - 1.0).abs() < 1e-12);
        }
        assert_eq!(m.weight_by_id("A", "B"), Some(0.5));
        assert_eq!(result.report.num_tasks, 3);
        assert_eq!(result.report.num_zero_columns, 0);
        assert!(result.report.seeded);
    }

    #[test]
    fn test_zero_importances_give_zero_columns() {
        let result = infer_network_with(&matrix(), &seeded(), &MockTrainer::zeros()).unwrap();
        assert!(result.matrix.as_slice().iter().all(|&w| w == 0.0));
        assert_eq!(result.report.num_zero_columns, 3);
    }

    #[test]
    fn test_trainer_failure_aborts_run() {
        let err = infer_network_with(&matrix(), &seeded(), &MockTrainer::failing("out of memory")).unwrap_err();
        match err {
            ArborixError::TaskFailed { target, source } => {
                assert_eq!(target, "A");
                assert!(source.to_string().contains("out of memory"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_importance_is_contract_violation() {
        let err = infer_network_with(&matrix(), &seeded(), &MockTrainer::constant(-1.0)).unwrap_err();
        assert!(matches!(err, ArborixError::TaskFailed { .. }));
    }

    #[test]
    fn test_validation_before_any_task() {
        let config = InferenceConfig { num_trees: 0, ..seeded() };
        let err = infer_network_with(&matrix(), &config, &MockTrainer::failing("never called")).unwrap_err();
        assert!(matches!(err, ArborixError::InvalidParameter { ref param, .. } if param == "num_trees"));

        let config = InferenceConfig {
            candidate_regulators: Some(GeneSelector::from(vec!["A", "Q"])),
            ..seeded()
        };
        let err = infer_network_with(&matrix(), &config, &MockTrainer::failing("never called")).unwrap_err();
        assert!(matches!(err, ArborixError::UnknownGene { .. }));
    }

    #[test]
    fn test_target_subset_leaves_other_columns_empty() {
        let config = InferenceConfig {
            targets: Some(GeneSelector::from(vec!["C"])),
            ..seeded()
        };
        let result = infer_network_with(&matrix(), &config, &MockTrainer::constant(1.0)).unwrap();
        assert_eq!(result.matrix.n_genes(), 3);
        assert_eq!(result.matrix.column_sum(0), 0.0);
        assert_eq!(result.matrix.column_sum(1), 0.0);
        assert!((result.matrix.column_sum(2) - 1.0).abs() < 1e-12);
        assert_eq!(result.report.num_tasks, 1);
    }

    #[test]
    fn test_unseeded_run_records_base_seed() {
        let config = InferenceConfig { num_trees: 5, ..Default::default() };
        let result = infer_network_with(&matrix(), &config, &MockTrainer::constant(1.0)).unwrap();
        assert!(!result.report.seeded);

        let fixed = infer_network_with(&matrix(), &seeded(), &MockTrainer::constant(1.0)).unwrap();
        assert_eq!(fixed.report.base_seed, 1);
    }
}
