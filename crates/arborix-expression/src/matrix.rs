//! In-memory genes × samples expression table.

use std::collections::HashMap;

use arborix_common::{ArborixError, GeneSelector, Result};

/// Genes × samples numeric table, stored row-major (one contiguous row per gene).
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    genes: Vec<String>,
    samples: Option<Vec<String>>,
    values: Vec<f64>,
    n_samples: usize,
    /// gene identifier -> row index
    index: HashMap<String, usize>,
}

impl PartialEq for ExpressionMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.genes == other.genes
            && self.samples == other.samples
            && self.n_samples == other.n_samples
            && self.values == other.values
    }
}

impl ExpressionMatrix {
    /// Build a matrix from one value row per gene.
    ///
    /// Fails if there are no genes or samples, if rows are ragged, if a gene
    /// identifier is empty or repeated, or if any value is not finite.
    pub fn new(genes: Vec<String>, samples: Option<Vec<String>>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if genes.is_empty() {
            return Err(ArborixError::InvalidExpressionMatrix("no genes".to_string()));
        }
        if rows.len() != genes.len() {
            return Err(ArborixError::InvalidExpressionMatrix(format!(
                "{} gene identifiers but {} value rows",
                genes.len(),
                rows.len()
            )));
        }

        let n_samples = rows[0].len();
        if n_samples == 0 {
            return Err(ArborixError::InvalidExpressionMatrix("no samples".to_string()));
        }
        if let Some(ref names) = samples {
            if names.len() != n_samples {
                return Err(ArborixError::InvalidExpressionMatrix(format!(
                    "{} sample identifiers but {} sample columns",
                    names.len(),
                    n_samples
                )));
            }
        }

        let mut index = HashMap::with_capacity(genes.len());
        let mut values = Vec::with_capacity(genes.len() * n_samples);
        for (i, (gene, row)) in genes.iter().zip(rows.iter()).enumerate() {
            if gene.trim().is_empty() {
                return Err(ArborixError::InvalidExpressionMatrix(format!(
                    "row {i} has an empty gene identifier"
                )));
            }
            if index.insert(gene.clone(), i).is_some() {
                return Err(ArborixError::InvalidExpressionMatrix(format!(
                    "duplicate gene identifier: {gene}"
                )));
            }
            if row.len() != n_samples {
                return Err(ArborixError::InvalidExpressionMatrix(format!(
                    "gene {gene} has {} values, expected {n_samples}",
                    row.len()
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(ArborixError::InvalidExpressionMatrix(format!(
                    "gene {gene} has a non-finite value in sample column {j}"
                )));
            }
            values.extend_from_slice(row);
        }

        Ok(Self { genes, samples, values, n_samples, index })
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Gene identifiers in row order.
    pub fn gene_ids(&self) -> &[String] {
        &self.genes
    }

    pub fn sample_ids(&self) -> Option<&[String]> {
        self.samples.as_deref()
    }

    pub fn gene_id(&self, row: usize) -> &str {
        &self.genes[row]
    }

    pub fn gene_index(&self, gene: &str) -> Option<usize> {
        self.index.get(gene).copied()
    }

    pub fn has_gene(&self, gene: &str) -> bool {
        self.index.contains_key(gene)
    }

    /// Expression of one gene across all samples.
    pub fn gene_row(&self, row: usize) -> &[f64] {
        let start = row * self.n_samples;
        &self.values[start..start + self.n_samples]
    }

    pub fn gene_row_by_id(&self, gene: &str) -> Option<&[f64]> {
        self.gene_index(gene).map(|row| self.gene_row(row))
    }

    pub fn value(&self, row: usize, sample: usize) -> f64 {
        self.values[row * self.n_samples + sample]
    }

    /// Resolve an optional gene selection to sorted, de-duplicated row indices.
    ///
    /// `None` selects every gene. `param` names the configuration field in
    /// error messages.
    pub fn resolve(&self, selector: Option<&GeneSelector>, param: &str) -> Result<Vec<usize>> {
        let mut rows = match selector {
            None => return Ok((0..self.n_genes()).collect()),
            Some(GeneSelector::Names(names)) => names
                .iter()
                .map(|name| {
                    self.gene_index(name).ok_or_else(|| ArborixError::UnknownGene {
                        param: param.to_string(),
                        gene: name.clone(),
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(GeneSelector::Indices(indices)) => {
                if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_genes()) {
                    return Err(ArborixError::UnknownGene {
                        param: param.to_string(),
                        gene: format!("index {bad} (matrix has {} genes)", self.n_genes()),
                    });
                }
                indices.clone()
            }
        };
        if rows.is_empty() {
            return Err(ArborixError::invalid_parameter(param, "must not be empty"));
        }
        rows.sort_unstable();
        rows.dedup();
        Ok(rows)
    }

    /// Copy with every gene centred and scaled to unit sample standard deviation.
    ///
    /// Each row is first divided by its largest magnitude, so rows near
    /// `f64::MAX` do not overflow the variance. Genes with zero variance (or a
    /// single sample) become all zeros.
    pub fn standardized(&self) -> Self {
        let n = self.n_samples;
        let mut values = Vec::with_capacity(self.values.len());
        for row in self.values.chunks(n) {
            let scale = row.iter().fold(0.0f64, |m, v| m.max(v.abs()));
            if scale == 0.0 {
                values.extend(std::iter::repeat(0.0).take(n));
                continue;
            }
            let scaled: Vec<f64> = row.iter().map(|v| v / scale).collect();
            let mean = scaled.iter().sum::<f64>() / n as f64;
            let sd = if n > 1 {
                (scaled.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
            } else {
                0.0
            };
            if sd > 0.0 {
                values.extend(scaled.iter().map(|v| (v - mean) / sd));
            } else {
                values.extend(scaled.iter().map(|v| v - mean));
            }
        }
        Self {
            genes: self.genes.clone(),
            samples: self.samples.clone(),
            values,
            n_samples: n,
            index: self.index.clone(),
        }
    }
}
