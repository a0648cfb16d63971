//! Inference and ranking configuration.
//!
//! Users describe an inference run via YAML/JSON/TOML. Every field has a
//! default, so an empty document is a valid configuration that runs the
//! random-forest variant with `sqrt` feature subsampling and 1000 trees.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ArborixError, Result};

// ── Tree method ──────────────────────────────────────────────────────────────

/// Randomization scheme of the tree ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TreeMethod {
    /// Random forest: bootstrap resampling, best threshold per candidate feature.
    #[default]
    RandomForest,
    /// Extra-trees: no bootstrap, one random threshold per candidate feature.
    ExtraTrees,
}

impl TreeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreeMethod::RandomForest => "RF",
            TreeMethod::ExtraTrees => "ET",
        }
    }

    /// Whether each tree is grown on a bootstrap resample.
    pub fn bootstrap(&self) -> bool {
        matches!(self, TreeMethod::RandomForest)
    }

    /// Whether split thresholds are drawn at random.
    pub fn extra_randomization(&self) -> bool {
        matches!(self, TreeMethod::ExtraTrees)
    }
}

impl fmt::Display for TreeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TreeMethod {
    type Err = ArborixError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RF" => Ok(TreeMethod::RandomForest),
            "ET" => Ok(TreeMethod::ExtraTrees),
            other => Err(ArborixError::invalid_parameter(
                "tree_method",
                format!("expected \"RF\" or \"ET\", got {other:?}"),
            )),
        }
    }
}

impl TryFrom<String> for TreeMethod {
    type Error = ArborixError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TreeMethod> for String {
    fn from(value: TreeMethod) -> Self {
        value.as_str().to_string()
    }
}

// ── Split-feature count ──────────────────────────────────────────────────────

/// Number of candidate features considered at each split (`mtry`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "KSpecRepr", into = "KSpecRepr")]
pub enum KSpec {
    /// `round(sqrt(predictor_count))`
    #[default]
    Sqrt,
    /// Every predictor.
    All,
    /// A literal count, used as-is.
    Fixed(usize),
}

impl KSpec {
    /// Resolve to a concrete `mtry` for a task with `n_predictors` predictors.
    pub fn resolve(&self, n_predictors: usize) -> usize {
        match self {
            KSpec::Sqrt => (n_predictors as f64).sqrt().round() as usize,
            KSpec::All => n_predictors,
            KSpec::Fixed(k) => *k,
        }
    }
}

impl FromStr for KSpec {
    type Err = ArborixError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "sqrt" => return Ok(KSpec::Sqrt),
            "all" => return Ok(KSpec::All),
            _ => {}
        }
        match s.parse::<i64>() {
            Ok(k) if k > 0 => Ok(KSpec::Fixed(k as usize)),
            Ok(k) => Err(ArborixError::invalid_parameter(
                "k",
                format!("must be a positive integer, got {k}"),
            )),
            Err(_) => Err(ArborixError::invalid_parameter(
                "k",
                format!("expected \"sqrt\", \"all\" or a positive integer, got {s:?}"),
            )),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum KSpecRepr {
    Count(i64),
    Name(String),
}

impl TryFrom<KSpecRepr> for KSpec {
    type Error = ArborixError;

    fn try_from(value: KSpecRepr) -> Result<Self> {
        match value {
            KSpecRepr::Count(k) => k.to_string().parse(),
            KSpecRepr::Name(name) => name.parse(),
        }
    }
}

impl From<KSpec> for KSpecRepr {
    fn from(value: KSpec) -> Self {
        match value {
            KSpec::Sqrt => KSpecRepr::Name("sqrt".to_string()),
            KSpec::All => KSpecRepr::Name("all".to_string()),
            KSpec::Fixed(k) => KSpecRepr::Count(k as i64),
        }
    }
}

// ── Gene selection ───────────────────────────────────────────────────────────

/// A subset of genes, given by identifier or by 0-based row index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeneSelector {
    Names(Vec<String>),
    Indices(Vec<usize>),
}

impl GeneSelector {
    pub fn len(&self) -> usize {
        match self {
            GeneSelector::Names(names) => names.len(),
            GeneSelector::Indices(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<&str>> for GeneSelector {
    fn from(names: Vec<&str>) -> Self {
        GeneSelector::Names(names.into_iter().map(str::to_string).collect())
    }
}

// ── Inference configuration ──────────────────────────────────────────────────

/// Complete configuration of one network inference run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// `"RF"` or `"ET"`
    #[serde(default)]
    pub tree_method: TreeMethod,

    /// `"sqrt"`, `"all"` or a positive integer
    #[serde(default)]
    pub k: KSpec,

    /// Trees per regression task
    #[serde(default = "default_num_trees")]
    pub num_trees: usize,

    /// Genes allowed as link sources; all genes when absent
    #[serde(default)]
    pub candidate_regulators: Option<GeneSelector>,

    /// Genes that get a regression task; all genes when absent
    #[serde(default)]
    pub targets: Option<GeneSelector>,

    /// Worker threads; 1 runs sequentially
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Base seed of the per-task random streams; drawn at random when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// Minimum number of samples in a leaf
    #[serde(default = "default_min_leaf_size")]
    pub min_leaf_size: usize,

    /// Use permutation importance instead of impurity reduction
    #[serde(default)]
    pub permutation_importance: bool,

    /// Centre and scale every gene to unit variance before building tasks
    #[serde(default = "default_true")]
    pub standardize: bool,
}

fn default_num_trees() -> usize { 1000 }
fn default_parallelism() -> usize { 1 }
fn default_min_leaf_size() -> usize { 1 }
fn default_true() -> bool { true }

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            tree_method: TreeMethod::default(),
            k: KSpec::default(),
            num_trees: default_num_trees(),
            candidate_regulators: None,
            targets: None,
            parallelism: default_parallelism(),
            seed: None,
            min_leaf_size: default_min_leaf_size(),
            permutation_importance: false,
            standardize: true,
        }
    }
}

impl InferenceConfig {
    /// Check every parameter that can be checked without the expression matrix.
    pub fn validate(&self) -> Result<()> {
        if self.num_trees == 0 {
            return Err(ArborixError::invalid_parameter("num_trees", "must be a positive integer"));
        }
        if self.parallelism == 0 {
            return Err(ArborixError::invalid_parameter("parallelism", "must be a positive integer"));
        }
        if self.min_leaf_size == 0 {
            return Err(ArborixError::invalid_parameter("min_leaf_size", "must be a positive integer"));
        }
        if self.k == KSpec::Fixed(0) {
            return Err(ArborixError::invalid_parameter("k", "must be a positive integer"));
        }
        if matches!(&self.candidate_regulators, Some(sel) if sel.is_empty()) {
            return Err(ArborixError::invalid_parameter("candidate_regulators", "must not be empty"));
        }
        if matches!(&self.targets, Some(sel) if sel.is_empty()) {
            return Err(ArborixError::invalid_parameter("targets", "must not be empty"));
        }
        Ok(())
    }

    /// Load from YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load from JSON file
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Parse from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

// ── Ranking configuration ────────────────────────────────────────────────────

/// Limits applied when extracting the ranked link list.
///
/// When both are set the `min_weight` filter runs first and the survivors
/// are truncated to `max_count`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Keep at most this many links
    #[serde(default)]
    pub max_count: Option<usize>,

    /// Keep only links with weight ≥ this value
    #[serde(default)]
    pub min_weight: Option<f64>,
}

impl RankingConfig {
    pub fn top(max_count: usize) -> Self {
        Self { max_count: Some(max_count), min_weight: None }
    }

    pub fn threshold(min_weight: f64) -> Self {
        Self { max_count: None, min_weight: Some(min_weight) }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_count == Some(0) {
            return Err(ArborixError::InvalidRankingParameter(
                "max_count must be at least 1".to_string(),
            ));
        }
        if let Some(w) = self.min_weight {
            if !w.is_finite() || w < 0.0 {
                return Err(ArborixError::InvalidRankingParameter(format!(
                    "min_weight must be a finite non-negative number, got {w}"
                )));
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InferenceConfig::default();
        assert_eq!(config.tree_method, TreeMethod::RandomForest);
        assert_eq!(config.k, KSpec::Sqrt);
        assert_eq!(config.num_trees, 1000);
        assert_eq!(config.parallelism, 1);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: InferenceConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, InferenceConfig::default());
    }

    #[test]
    fn test_k_spec_resolution() {
        assert_eq!(KSpec::Sqrt.resolve(9), 3);
        assert_eq!(KSpec::Sqrt.resolve(3), 2); // sqrt(3) ≈ 1.73
        assert_eq!(KSpec::Sqrt.resolve(1), 1);
        assert_eq!(KSpec::All.resolve(7), 7);
        assert_eq!(KSpec::Fixed(4).resolve(2), 4);
    }

    #[test]
    fn test_k_spec_parses_names_and_counts() {
        let config: InferenceConfig = serde_json::from_str(r#"{"k": "all"}"#).unwrap();
        assert_eq!(config.k, KSpec::All);
        let config: InferenceConfig = serde_json::from_str(r#"{"k": 5}"#).unwrap();
        assert_eq!(config.k, KSpec::Fixed(5));
        assert!(serde_json::from_str::<InferenceConfig>(r#"{"k": 0}"#).is_err());
        assert!(serde_json::from_str::<InferenceConfig>(r#"{"k": "half"}"#).is_err());
    }

    #[test]
    fn test_tree_method_parsing() {
        assert_eq!("RF".parse::<TreeMethod>().unwrap(), TreeMethod::RandomForest);
        assert_eq!("et".parse::<TreeMethod>().unwrap(), TreeMethod::ExtraTrees);
        let err = "GBM".parse::<TreeMethod>().unwrap_err();
        assert!(err.to_string().contains("tree_method"));
        assert!(TreeMethod::RandomForest.bootstrap());
        assert!(TreeMethod::ExtraTrees.extra_randomization());
    }

    #[test]
    fn test_gene_selector_accepts_names_or_indices() {
        let config: InferenceConfig =
            serde_json::from_str(r#"{"candidate_regulators": ["TP53", "MYC"]}"#).unwrap();
        assert_eq!(config.candidate_regulators, Some(GeneSelector::from(vec!["TP53", "MYC"])));

        let config: InferenceConfig =
            serde_json::from_str(r#"{"candidate_regulators": [0, 2]}"#).unwrap();
        assert_eq!(config.candidate_regulators, Some(GeneSelector::Indices(vec![0, 2])));
    }

    #[test]
    fn test_validation_names_offending_parameter() {
        let config = InferenceConfig { num_trees: 0, ..Default::default() };
        assert!(config.validate().unwrap_err().to_string().contains("num_trees"));

        let config = InferenceConfig { parallelism: 0, ..Default::default() };
        assert!(config.validate().unwrap_err().to_string().contains("parallelism"));

        let config = InferenceConfig {
            candidate_regulators: Some(GeneSelector::Names(vec![])),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("candidate_regulators"));
    }

    #[test]
    fn test_toml_config() {
        let config = InferenceConfig::from_toml_str(
            r#"
            tree_method = "ET"
            k = "all"
            num_trees = 250
            parallelism = 4
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.tree_method, TreeMethod::ExtraTrees);
        assert_eq!(config.num_trees, 250);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = InferenceConfig {
            k: KSpec::Fixed(3),
            seed: Some(42),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: InferenceConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_load_from_yaml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("inference.yaml");
        std::fs::write(&yaml_path, "tree_method: ET\nnum_trees: 300\ncandidate_regulators: [0, 1]\n").unwrap();
        let config = InferenceConfig::from_yaml(&yaml_path).unwrap();
        assert_eq!(config.tree_method, TreeMethod::ExtraTrees);
        assert_eq!(config.num_trees, 300);
        assert_eq!(config.candidate_regulators, Some(GeneSelector::Indices(vec![0, 1])));

        let json_path = dir.path().join("inference.json");
        std::fs::write(&json_path, r#"{"k": 2, "seed": 11, "targets": ["MYC"]}"#).unwrap();
        let config = InferenceConfig::from_json(&json_path).unwrap();
        assert_eq!(config.k, KSpec::Fixed(2));
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.targets, Some(GeneSelector::from(vec!["MYC"])));

        let err = InferenceConfig::from_json(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ArborixError::Io(_)));
        std::fs::write(&json_path, "{not json").unwrap();
        let err = InferenceConfig::from_json(&json_path).unwrap_err();
        assert!(matches!(err, ArborixError::Serialization(_)));
    }

    #[test]
    fn test_ranking_validation() {
        assert!(RankingConfig::default().validate().is_ok());
        assert!(RankingConfig::top(0).validate().is_err());
        assert!(RankingConfig::threshold(-0.1).validate().is_err());
        assert!(RankingConfig::threshold(f64::NAN).validate().is_err());
        let both = RankingConfig { max_count: Some(5), min_weight: Some(0.1) };
        assert!(both.validate().is_ok());
    }
}
