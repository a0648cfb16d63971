//! Configuration loading for the arborix runner.
//! Reads arborix.toml from the current directory, the first command-line
//! argument or the path in the ARBORIX_CONFIG env var.

use std::path::{Path, PathBuf};

use arborix_common::{InferenceConfig, RankingConfig};
use arborix_expression::CsvOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub expression: ExpressionConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionConfig {
    pub path: PathBuf,
    /// `","`, `";"` or `"tab"`
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_has_header")]
    pub has_header: bool,
}

fn default_delimiter() -> String { ",".to_string() }
fn default_has_header() -> bool { true }

impl ExpressionConfig {
    pub fn csv_options(&self) -> anyhow::Result<CsvOptions> {
        let delimiter = match self.delimiter.as_str() {
            "tab" | "\\t" | "\t" => b'\t',
            d if d.len() == 1 => d.as_bytes()[0],
            other => anyhow::bail!("Unsupported delimiter {:?}: expected a single character or \"tab\"", other),
        };
        Ok(CsvOptions { delimiter, has_header: self.has_header })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Ranked link list as CSV; stdout when absent
    pub links: Option<PathBuf>,
    /// Run report as JSON
    pub report: Option<PathBuf>,
}

impl Config {
    /// Load configuration from arborix.toml.
    /// An explicit path wins over ARBORIX_CONFIG, which wins over the current directory.
    pub fn load(explicit: Option<&str>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => p.to_string(),
            None => std::env::var("ARBORIX_CONFIG").unwrap_or_else(|_| "arborix.toml".to_string()),
        };

        if !Path::new(&path).exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Create arborix.toml with at least an [expression] path.",
                path
            );
        }

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.inference.validate()?;
        config.ranking.validate()?;
        Ok(config)
    }
}
