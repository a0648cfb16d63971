//! Gene-expression matrices for network inference.
//!
//! An [`ExpressionMatrix`] holds one row per gene and one column per sample.
//! Gene identifiers are mandatory and unique; sample identifiers are optional.
//!
//! # Example
//!
//! ```rust,no_run
//! use arborix_expression::{CsvOptions, ExpressionMatrix};
//!
//! fn main() -> arborix_common::Result<()> {
//!     let matrix = ExpressionMatrix::from_path("expression.tsv", &CsvOptions::tsv())?;
//!     println!("{} genes x {} samples", matrix.n_genes(), matrix.n_samples());
//!
//!     if let Some(row) = matrix.gene_row_by_id("TP53") {
//!         println!("TP53 mean: {}", row.iter().sum::<f64>() / row.len() as f64);
//!     }
//!     Ok(())
//! }
//! ```

pub mod loader;
pub mod matrix;

pub use loader::CsvOptions;
pub use matrix::ExpressionMatrix;
