//! arborix-forest — Tree-ensemble feature importance.
//!
//! The inference engine only talks to the [`EnsembleTrainer`] trait: a pure
//! function from (predictor table, response, hyperparameters, random stream)
//! to one non-negative importance per predictor. [`TreeEnsembleTrainer`] is
//! the bundled implementation (random forest / extra-trees regression).

pub mod trainer;
pub mod tree;
pub mod ensemble;

pub use ensemble::TreeEnsembleTrainer;
pub use trainer::{EnsembleTrainer, MockTrainer, RegressionProblem, TrainerParams};
