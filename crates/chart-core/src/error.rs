use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Cache corrupt: {0}")]
    CacheCorrupt(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(String),
}
