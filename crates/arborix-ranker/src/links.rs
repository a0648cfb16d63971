//! Ranked link list extraction.

use std::cmp::Ordering;

use arborix_common::{RankingConfig, Result};
use arborix_infer::AdjacencyMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One directed regulatory link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub regulator: String,
    pub target: String,
    pub weight: f64,
}

/// Links sorted by descending weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LinkList {
    links: Vec<Link>,
}

impl LinkList {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Link> {
        self.links.iter()
    }

    pub fn as_slice(&self) -> &[Link] {
        &self.links
    }

    pub fn into_vec(self) -> Vec<Link> {
        self.links
    }
}

impl IntoIterator for LinkList {
    type Item = Link;
    type IntoIter = std::vec::IntoIter<Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}

impl<'a> IntoIterator for &'a LinkList {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

/// Strongest first; equal weights ordered by regulator id, then target id.
fn by_confidence(a: &Link, b: &Link) -> Ordering {
    b.weight
        .total_cmp(&a.weight)
        .then_with(|| a.regulator.cmp(&b.regulator))
        .then_with(|| a.target.cmp(&b.target))
}

/// Every link with positive weight, ranked.
///
/// `min_weight` drops links below the threshold, then `max_count` keeps the
/// head of what is left. Zero-weight cells are never links.
pub fn rank(matrix: &AdjacencyMatrix, config: &RankingConfig) -> Result<LinkList> {
    config.validate()?;

    let genes = matrix.gene_ids();
    let min_weight = config.min_weight.unwrap_or(0.0);
    let mut links = Vec::new();
    for (r, regulator) in genes.iter().enumerate() {
        for (t, &weight) in matrix.row(r).iter().enumerate() {
            if weight > 0.0 && weight >= min_weight {
                links.push(Link {
                    regulator: regulator.clone(),
                    target: genes[t].clone(),
                    weight,
                });
            }
        }
    }

    links.sort_by(by_confidence);
    if let Some(max) = config.max_count {
        links.truncate(max);
    }
    debug!(links = links.len(), "Ranked regulatory links");
    Ok(LinkList { links })
}
