//! Randomized regression-tree ensemble (random forest / extra-trees).

use arborix_common::{ArborixError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, trace};

use crate::trainer::{EnsembleTrainer, RegressionProblem, TrainerParams};
use crate::tree::{RegressionTree, SplitRule};

/// Bundled [`EnsembleTrainer`].
///
/// Impurity importance is the SSE reduction of a feature summed over the
/// nodes of a tree and averaged over trees. Permutation importance is the
/// mean increase of squared error on held-out samples (out-of-bag samples
/// with bootstrap, the training samples without) when the feature is
/// shuffled, clamped at zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeEnsembleTrainer;

impl TreeEnsembleTrainer {
    pub fn new() -> Self {
        Self
    }
}

impl EnsembleTrainer for TreeEnsembleTrainer {
    fn importances(
        &self,
        problem: &RegressionProblem<'_>,
        params: &TrainerParams,
        rng: &mut StdRng,
    ) -> Result<Vec<f64>> {
        problem.validate()?;
        params.validate()?;

        // SSE terms square the response; shrink it when they would overflow.
        let rescaled = rescaled_response(problem.response);
        if rescaled.is_some() {
            debug!("Response magnitude too large for SSE; importances reported on the rescaled response");
        }
        let problem = &match &rescaled {
            Some(response) => RegressionProblem { response, ..*problem },
            None => *problem,
        };

        let n = problem.n_samples;
        let p = problem.n_predictors;
        if params.mtry > p {
            trace!("mtry {} clamped to {} predictors", params.mtry, p);
        }
        let rule = SplitRule {
            mtry: params.mtry.min(p),
            min_leaf_size: params.min_leaf_size,
            extra_randomization: params.extra_randomization,
        };

        let mut impurity = vec![0.0; p];
        let mut permutation = vec![0.0; p];
        let mut evaluated_trees = 0usize;
        let mut in_bag = vec![false; n];

        for _ in 0..params.num_trees {
            let samples: Vec<usize> = if params.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };

            if !params.permutation_importance {
                RegressionTree::grow(problem, samples, &rule, rng, &mut impurity);
                continue;
            }

            in_bag.iter_mut().for_each(|b| *b = false);
            samples.iter().for_each(|&s| in_bag[s] = true);
            let held_out: Vec<usize> = if params.bootstrap {
                (0..n).filter(|&s| !in_bag[s]).collect()
            } else {
                (0..n).collect()
            };

            let mut scratch = vec![0.0; p];
            let tree = RegressionTree::grow(problem, samples, &rule, rng, &mut scratch);
            if held_out.is_empty() {
                continue;
            }
            evaluated_trees += 1;
            accumulate_permutation(problem, &tree, &held_out, rng, &mut permutation);
        }

        let importances = if params.permutation_importance {
            if evaluated_trees == 0 {
                return Ok(vec![0.0; p]);
            }
            permutation
                .into_iter()
                .map(|v| (v / evaluated_trees as f64).max(0.0))
                .collect::<Vec<_>>()
        } else {
            impurity
                .into_iter()
                .map(|v| v / params.num_trees as f64)
                .collect::<Vec<_>>()
        };

        if importances.iter().any(|v| !v.is_finite()) {
            return Err(ArborixError::Trainer("non-finite importance".to_string()));
        }
        Ok(importances)
    }
}

/// The response divided by its largest magnitude, when `n * sum(y^2)` is not
/// representable.
fn rescaled_response(response: &[f64]) -> Option<Vec<f64>> {
    let sum_sq: f64 = response.iter().map(|v| v * v).sum();
    if (sum_sq * response.len() as f64).is_finite() {
        return None;
    }
    let scale = response.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    Some(response.iter().map(|v| v / scale).collect())
}

/// Add, per feature, the increase of mean squared error on `held_out` after
/// shuffling that feature's values among the held-out samples.
fn accumulate_permutation(
    problem: &RegressionProblem<'_>,
    tree: &RegressionTree,
    held_out: &[usize],
    rng: &mut StdRng,
    out: &mut [f64],
) {
    let m = held_out.len() as f64;
    let base_mse = held_out
        .iter()
        .map(|&s| (problem.response[s] - tree.predict(problem, s)).powi(2))
        .sum::<f64>()
        / m;

    let mut shuffled = held_out.to_vec();
    for (feature, slot) in out.iter_mut().enumerate() {
        shuffled.shuffle(rng);
        let mse = held_out
            .iter()
            .zip(shuffled.iter())
            .map(|(&s, &donor)| {
                let pred = tree.predict_with(|f| {
                    if f == feature {
                        problem.x(donor, f)
                    } else {
                        problem.x(s, f)
                    }
                });
                (problem.response[s] - pred).powi(2)
            })
            .sum::<f64>()
            / m;
        *slot += mse - base_mse;
    }
}
