use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid git sha: {0}")]
    InvalidSha(String),

    #[error("artifact path must not be empty")]
    EmptyArtifactPath,

    #[error("application name must not be empty")]
    EmptyAppName,
}

pub type Result<T> = std::result::Result<T, ModelError>;
