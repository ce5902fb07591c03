use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to render build descriptor: {0}")]
    Render(#[from] tera::Error),

    #[error("failed to stage build context: {0}")]
    Staging(#[from] std::io::Error),

    #[error("failed to fetch artifact {path}: {message}")]
    Fetch { path: String, message: String },

    #[error("Docker connection error: {0}")]
    DockerConnection(#[from] bollard::errors::Error),

    #[error("image build failed: {0}")]
    BuildFailed(String),

    #[error("failed to push image {image}: {message}")]
    PushFailed { image: String, message: String },

    #[error("malformed dockercfg document in secret {secret}: {message}")]
    MalformedDockerCfg { secret: String, message: String },

    #[error("no registry credentials found for host {0}")]
    NoCredentials(String),
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
