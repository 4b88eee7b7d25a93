use thiserror::Error;

use crate::blacklist::StoreError;
use crate::source::static_graph::GraphError;
use crate::source::SourceError;

#[derive(Error, Debug)]
pub enum ScreeningError {
    #[error("Transaction provider error: {0}")]
    Source(#[from] SourceError),

    #[error("Blacklist store error: {0}")]
    Store(#[from] StoreError),

    #[error("Static graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ScreeningError>;
