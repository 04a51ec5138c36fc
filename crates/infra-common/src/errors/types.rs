use thiserror::Error;

/// Errors raised by the infrastructure layer
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A background task panicked or could not be joined
    #[error("Task error: {0}")]
    Task(String),

    /// Logging could not be initialised
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Result type for infrastructure operations
pub type Result<T> = std::result::Result<T, Error>;
