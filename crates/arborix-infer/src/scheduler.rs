//! Task farm over target genes.
//!
//! Every task gets its own random stream derived from the run's base seed
//! and the target's row index. No stream is shared between tasks, so the
//! importances of a task do not depend on execution order or worker count:
//! a sequential run and a parallel run with the same seed are bit-identical.

use std::collections::BTreeMap;

use arborix_common::{ArborixError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::debug;

use crate::task::RegressionTask;

/// Counter-based task RNG. Same (seed, task index) → same draw sequence.
///
/// The multiplicative mix decorrelates nearby (seed, index) pairs.
pub fn task_rng(base_seed: u64, task_index: u64) -> StdRng {
    StdRng::seed_from_u64(base_seed.wrapping_mul(2654435761).wrapping_add(task_index))
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    parallelism: usize,
    base_seed: u64,
}

impl Scheduler {
    pub fn new(parallelism: usize, base_seed: u64) -> Self {
        Self { parallelism: parallelism.max(1), base_seed }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Run `work` once per task and collect its output by target gene.
    ///
    /// With `parallelism == 1` tasks run in the given order on the calling
    /// thread; otherwise on a dedicated pool of `parallelism` workers. Any
    /// failure aborts the run and is reported with its target gene.
    pub fn run<F>(&self, tasks: &[RegressionTask], work: F) -> Result<BTreeMap<String, Vec<f64>>>
    where
        F: Fn(&RegressionTask, &mut StdRng) -> Result<Vec<f64>> + Sync,
    {
        let run_one = |task: &RegressionTask| -> Result<(String, Vec<f64>)> {
            let mut rng = task_rng(self.base_seed, task.target_index as u64);
            let importances =
                work(task, &mut rng).map_err(|e| ArborixError::task_failed(&task.target, e))?;
            debug!(target_gene = %task.target, predictors = task.n_predictors(), "Task finished");
            Ok((task.target.clone(), importances))
        };

        let outcomes: Vec<(String, Vec<f64>)> = if self.parallelism == 1 {
            tasks.iter().map(run_one).collect::<Result<_>>()?
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.parallelism)
                .build()
                .map_err(|e| ArborixError::invalid_parameter("parallelism", e.to_string()))?;
            pool.install(|| tasks.par_iter().map(run_one).collect::<Result<Vec<_>>>())?
        };

        let mut merged = BTreeMap::new();
        for (target, importances) in outcomes {
            if merged.insert(target.clone(), importances).is_some() {
                return Err(ArborixError::Assembly(format!("duplicate task for target {target}")));
            }
        }
        Ok(merged)
    }
}
