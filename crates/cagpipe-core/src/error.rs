//! Error types for cagpipe

use thiserror::Error;

/// Result type alias using CagError
pub type Result<T> = std::result::Result<T, CagError>;

/// Error type alias for convenience
pub type Error = CagError;

/// Main error type for cagpipe
#[derive(Debug, Error)]
pub enum CagError {
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Graph query error: {0}")]
    GraphQuery(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Pipeline stage '{stage}' failed: {source}")]
    Pipeline {
        stage: String,
        #[source]
        source: Box<CagError>,
    },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CagError {
    /// Annotate an error with the pipeline stage it surfaced in
    pub fn in_stage(self, stage: impl Into<String>) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// Name of the failing stage, if this is a pipeline error
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::Pipeline { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_stage_wraps_cause() {
        let err = CagError::Retrieval("store unreachable".to_string()).in_stage("retrieve_context");
        assert_eq!(err.stage(), Some("retrieve_context"));
        assert!(err.to_string().contains("retrieve_context"));
        assert!(err.to_string().contains("store unreachable"));
    }

    #[test]
    fn test_stage_is_none_for_plain_errors() {
        assert_eq!(CagError::Parse("bad json".to_string()).stage(), None);
    }
}
