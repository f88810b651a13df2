//! Error types for ficha-core

use thiserror::Error;

/// Result type alias using ficha-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ficha-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local persistent store failure
    #[error("Local store error: {0}")]
    LocalStore(String),

    /// Remote store failure (unreachable, rejected write)
    #[error("Remote store error: {0}")]
    RemoteStore(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
