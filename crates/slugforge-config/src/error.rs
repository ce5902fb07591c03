use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("environment variable {name} has invalid value: {value}")]
    InvalidVar { name: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
