//! Delimited-text loading of expression matrices.
//!
//! Expected layout: one row per gene, gene identifier in the first column,
//! one numeric column per sample. The optional header row carries sample
//! identifiers; its first cell (the gene-column label) may be omitted, as
//! R's `write.table` does.

use std::io::Read;
use std::path::Path;

use arborix_common::{ArborixError, Result};
use tracing::{debug, info};

use crate::matrix::ExpressionMatrix;

/// Parsing options for delimited expression files.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub has_header: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',', has_header: true }
    }
}

impl CsvOptions {
    pub fn tsv() -> Self {
        Self { delimiter: b'\t', ..Default::default() }
    }
}

impl ExpressionMatrix {
    /// Load a matrix from a delimited file.
    pub fn from_path(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading expression matrix from {:?}", path);
        let file = std::fs::File::open(path)?;
        let matrix = Self::from_reader(file, options)?;
        info!(
            "Loaded expression matrix: {} genes x {} samples from {:?}",
            matrix.n_genes(),
            matrix.n_samples(),
            path
        );
        Ok(matrix)
    }

    /// Load a matrix from any reader of delimited text.
    pub fn from_reader<R: Read>(reader: R, options: &CsvOptions) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut header: Option<Vec<String>> = None;
        let mut genes = Vec::new();
        let mut rows = Vec::new();

        for (line, result) in reader.records().enumerate() {
            let record = result?;
            if options.has_header && line == 0 {
                header = Some(record.iter().map(|s| s.to_string()).collect());
                continue;
            }
            let mut fields = record.iter();
            let gene = match fields.next() {
                Some(g) if !g.is_empty() => g.to_string(),
                _ => {
                    return Err(ArborixError::InvalidExpressionMatrix(format!(
                        "line {} has no gene identifier",
                        line + 1
                    )))
                }
            };
            let row = fields
                .enumerate()
                .map(|(j, field)| {
                    field.parse::<f64>().map_err(|_| {
                        ArborixError::InvalidExpressionMatrix(format!(
                            "gene {gene}: cannot parse {field:?} in sample column {j}"
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            genes.push(gene);
            rows.push(row);
        }

        let n_samples = rows.first().map(Vec::len).unwrap_or(0);
        let samples = header.and_then(|h| sample_ids_from_header(h, n_samples));
        Self::new(genes, samples, rows)
    }
}

/// Extract sample identifiers from a header row, with or without a corner cell.
/// An all-blank header means the samples are unnamed.
fn sample_ids_from_header(header: Vec<String>, n_samples: usize) -> Option<Vec<String>> {
    let names = if header.len() == n_samples + 1 {
        header.into_iter().skip(1).collect::<Vec<_>>()
    } else {
        header
    };
    if names.iter().all(|s| s.is_empty()) {
        None
    } else {
        Some(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_with_corner_cell() {
        let _ = tracing_subscriber::fmt::try_init();
        let data = "gene,s1,s2,s3\nTP53,1.0,2.0,3.0\nMYC,0.5,0.25,0.125\n";
        let m = ExpressionMatrix::from_reader(data.as_bytes(), &CsvOptions::default()).unwrap();
        assert_eq!(m.gene_ids(), &["TP53".to_string(), "MYC".to_string()]);
        assert_eq!(m.sample_ids().unwrap().len(), 3);
        assert_eq!(m.gene_row_by_id("MYC").unwrap()[2], 0.125);
    }

    #[test]
    fn test_tsv_header_without_corner_cell() {
        let data = "s1\ts2\nG1\t1\t2\nG2\t3\t4\n";
        let m = ExpressionMatrix::from_reader(data.as_bytes(), &CsvOptions::tsv()).unwrap();
        assert_eq!(m.sample_ids().unwrap(), &["s1".to_string(), "s2".to_string()]);
        assert_eq!(m.value(1, 0), 3.0);
    }

    #[test]
    fn test_headerless_samples_are_unnamed() {
        let data = "G1,1,2\nG2,3,4\n";
        let options = CsvOptions { has_header: false, ..Default::default() };
        let m = ExpressionMatrix::from_reader(data.as_bytes(), &options).unwrap();
        assert!(m.sample_ids().is_none());
        assert_eq!(m.n_genes(), 2);
    }

    #[test]
    fn test_unparseable_value_names_gene() {
        let data = "gene,s1,s2\nG1,1,abc\n";
        let err = ExpressionMatrix::from_reader(data.as_bytes(), &CsvOptions::default()).unwrap_err();
        assert!(err.to_string().contains("G1"));
    }

    #[test]
    fn test_missing_file() {
        let err = ExpressionMatrix::from_path("/nonexistent/expr.csv", &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, ArborixError::Io(_)));
    }
}
