//! Trait for ensemble feature-importance estimation.
//!
//! Decouples the network-inference engine from any particular tree-ensemble
//! implementation. One call = one regression task = one target gene.

use arborix_common::{ArborixError, Result, TreeMethod};
use rand::rngs::StdRng;

/// Input table of one regression task.
#[derive(Debug, Clone, Copy)]
pub struct RegressionProblem<'a> {
    pub n_samples: usize,
    pub n_predictors: usize,
    /// Row-major `n_samples x n_predictors` predictor values.
    pub predictors: &'a [f64],
    /// One response value per sample.
    pub response: &'a [f64],
}

impl<'a> RegressionProblem<'a> {
    pub fn new(n_samples: usize, n_predictors: usize, predictors: &'a [f64], response: &'a [f64]) -> Self {
        Self { n_samples, n_predictors, predictors, response }
    }

    /// Value of predictor `feature` in sample `sample`.
    #[inline]
    pub fn x(&self, sample: usize, feature: usize) -> f64 {
        self.predictors[sample * self.n_predictors + feature]
    }

    /// Check dimensions and finiteness.
    pub fn validate(&self) -> Result<()> {
        if self.n_samples == 0 {
            return Err(ArborixError::Trainer("no samples".to_string()));
        }
        if self.n_predictors == 0 {
            return Err(ArborixError::Trainer("no predictors".to_string()));
        }
        if self.predictors.len() != self.n_samples * self.n_predictors {
            return Err(ArborixError::Trainer(format!(
                "predictor table has {} values, expected {} x {}",
                self.predictors.len(),
                self.n_samples,
                self.n_predictors
            )));
        }
        if self.response.len() != self.n_samples {
            return Err(ArborixError::Trainer(format!(
                "response has {} values, expected {}",
                self.response.len(),
                self.n_samples
            )));
        }
        if self.predictors.iter().chain(self.response.iter()).any(|v| !v.is_finite()) {
            return Err(ArborixError::Trainer("non-finite input value".to_string()));
        }
        Ok(())
    }
}

/// Hyperparameters handed to the trainer for every task.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerParams {
    pub num_trees: usize,
    /// Candidate features per split.
    pub mtry: usize,
    pub min_leaf_size: usize,
    /// Draw split thresholds at random (extra-trees).
    pub extra_randomization: bool,
    /// Grow each tree on a bootstrap resample (bagging).
    pub bootstrap: bool,
    /// Report permutation importance instead of impurity reduction.
    pub permutation_importance: bool,
}

impl TrainerParams {
    pub fn new(method: TreeMethod, num_trees: usize, mtry: usize) -> Self {
        Self {
            num_trees,
            mtry,
            min_leaf_size: 1,
            extra_randomization: method.extra_randomization(),
            bootstrap: method.bootstrap(),
            permutation_importance: false,
        }
    }

    pub fn with_min_leaf_size(mut self, min_leaf_size: usize) -> Self {
        self.min_leaf_size = min_leaf_size;
        self
    }

    pub fn with_permutation_importance(mut self, enabled: bool) -> Self {
        self.permutation_importance = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_trees == 0 {
            return Err(ArborixError::Trainer("num_trees must be positive".to_string()));
        }
        if self.mtry == 0 {
            return Err(ArborixError::Trainer("mtry must be positive".to_string()));
        }
        if self.min_leaf_size == 0 {
            return Err(ArborixError::Trainer("min_leaf_size must be positive".to_string()));
        }
        Ok(())
    }
}

/// Estimates one raw importance per predictor for a regression task.
///
/// Implementations must:
/// - return exactly `problem.n_predictors` values, in predictor order
/// - return only finite, non-negative values
/// - draw all randomness from `rng`, so a task is reproducible from its stream
pub trait EnsembleTrainer: Send + Sync {
    fn importances(
        &self,
        problem: &RegressionProblem<'_>,
        params: &TrainerParams,
        rng: &mut StdRng,
    ) -> Result<Vec<f64>>;
}

// ── Mock Implementation for Testing ────────────────────────────────────────

#[derive(Debug, Clone)]
enum MockBehaviour {
    Constant(f64),
    Fail(String),
}

/// Mock trainer with fixed output for unit tests.
#[derive(Debug, Clone)]
pub struct MockTrainer {
    behaviour: MockBehaviour,
}

impl MockTrainer {
    /// Every predictor gets the same raw importance.
    pub fn constant(value: f64) -> Self {
        Self { behaviour: MockBehaviour::Constant(value) }
    }

    /// Every predictor gets zero importance.
    pub fn zeros() -> Self {
        Self::constant(0.0)
    }

    /// Every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self { behaviour: MockBehaviour::Fail(message.to_string()) }
    }
}

impl EnsembleTrainer for MockTrainer {
    fn importances(
        &self,
        problem: &RegressionProblem<'_>,
        _params: &TrainerParams,
        _rng: &mut StdRng,
    ) -> Result<Vec<f64>> {
        match &self.behaviour {
            MockBehaviour::Constant(v) => Ok(vec![*v; problem.n_predictors]),
            MockBehaviour::Fail(msg) => Err(ArborixError::Trainer(msg.clone())),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_problem_validation() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [0.5, 0.7];
        assert!(RegressionProblem::new(2, 2, &x, &y).validate().is_ok());
        assert!(RegressionProblem::new(2, 3, &x, &y).validate().is_err());
        assert!(RegressionProblem::new(4, 1, &x, &y).validate().is_err());

        let bad = [1.0, f64::INFINITY, 3.0, 4.0];
        assert!(RegressionProblem::new(2, 2, &bad, &y).validate().is_err());
    }

    #[test]
    fn test_params_follow_tree_method() {
        let rf = TrainerParams::new(TreeMethod::RandomForest, 10, 2);
        assert!(rf.bootstrap && !rf.extra_randomization);
        let et = TrainerParams::new(TreeMethod::ExtraTrees, 10, 2);
        assert!(!et.bootstrap && et.extra_randomization);
        assert!(TrainerParams::new(TreeMethod::ExtraTrees, 0, 2).validate().is_err());
    }

    #[test]
    fn test_mock_trainer() {
        let x = [1.0, 2.0, 3.0];
        let y = [0.5];
        let problem = RegressionProblem::new(1, 3, &x, &y);
        let params = TrainerParams::new(TreeMethod::RandomForest, 1, 1);
        let mut rng = StdRng::seed_from_u64(0);

        let out = MockTrainer::constant(2.0).importances(&problem, &params, &mut rng).unwrap();
        assert_eq!(out, vec![2.0; 3]);
        assert!(MockTrainer::failing("nope").importances(&problem, &params, &mut rng).is_err());
    }
}
