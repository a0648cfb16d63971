//! arborix-common — Shared types, errors, and configuration used across all Arborix crates.

pub mod error;
pub mod inference_config;

// Re-export commonly used types
pub use error::{ArborixError, Result};
pub use inference_config::{GeneSelector, InferenceConfig, KSpec, RankingConfig, TreeMethod};
