use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArborixError {
    #[error("Invalid parameter `{param}`: {reason}")]
    InvalidParameter { param: String, reason: String },

    #[error("Invalid expression matrix: {0}")]
    InvalidExpressionMatrix(String),

    #[error("Unknown gene in `{param}`: {gene}")]
    UnknownGene { param: String, gene: String },

    #[error("Invalid target gene: {0}")]
    InvalidTarget(String),

    #[error("Empty predictor set for target gene: {0}")]
    EmptyPredictorSet(String),

    #[error("Ensemble trainer error: {0}")]
    Trainer(String),

    #[error("Task for target gene {target} failed: {source}")]
    TaskFailed {
        target: String,
        #[source]
        source: Box<ArborixError>,
    },

    #[error("Matrix assembly error: {0}")]
    Assembly(String),

    #[error("Invalid ranking parameter: {0}")]
    InvalidRankingParameter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ArborixError {
    pub fn invalid_parameter(param: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap a per-task failure so the offending target gene is reported.
    pub fn task_failed(target: &str, source: ArborixError) -> Self {
        Self::TaskFailed {
            target: target.to_string(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, ArborixError>;
