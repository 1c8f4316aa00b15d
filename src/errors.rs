use diesel::result::Error as DieselError;

use crate::client::ClientError;
use crate::core::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Diesel error: {0}")]
    DieselError(#[from] DieselError),
    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Invalid duration '{value}': {source}")]
    DurationError {
        value: String,
        source: humantime::DurationError,
    },
    #[error("Upstream error: {0}")]
    UpstreamError(#[from] ClientError),
    #[error("Fetch error: {0}")]
    FetchError(#[from] FetchError),
    #[error("Schema error: {0}")]
    SchemaError(String),
}
