//! arborix-infer — Gene-regulatory network inference engine.
//!
//! Every target gene becomes one regression task (target expression ~
//! candidate regulators). A tree ensemble scores each regulator, the scores
//! of a task are normalised to sum to one and written into the target's
//! column of a regulator × target [`AdjacencyMatrix`].

pub mod adjacency;
pub mod network;
pub mod normalise;
pub mod scheduler;
pub mod task;

pub use adjacency::AdjacencyMatrix;
pub use network::{infer_network, infer_network_with, NetworkInference, RunReport};
pub use normalise::normalise_importances;
pub use scheduler::{task_rng, Scheduler};
pub use task::{build_task, build_tasks, RegressionTask};
