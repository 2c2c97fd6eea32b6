use thiserror::Error;

/// scratchbuild error types
#[derive(Error, Debug)]
pub enum ScratchError {
    /// Dockerfile could not be parsed
    #[error("Dockerfile parse error: {0}")]
    DockerfileParse(String),

    /// Dockerfile contains no FROM instruction
    #[error("Dockerfile did not have a FROM line")]
    MissingFrom,

    /// FROM instruction without a usable image argument
    #[error("Dockerfile FROM line is invalid: {original}")]
    InvalidFrom { original: String },

    /// Image reference could not be parsed
    #[error("Invalid image reference: {0}")]
    InvalidReference(String),

    /// The FROM chain references an image already in the stack
    #[error("Cycle detected: {reference} is already part of the stack")]
    CycleDetected { reference: String },

    /// The FROM chain is deeper than the configured limit
    #[error("Stack depth limit exceeded: more than {max_depth} layers")]
    DepthExceeded { max_depth: usize },

    /// Library source lookup failed
    #[error("Library source error: {image} - {message}")]
    LibrarySource { image: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for ScratchError {
    fn from(err: serde_json::Error) -> Self {
        ScratchError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ScratchError {
    fn from(err: serde_yaml::Error) -> Self {
        ScratchError::SerializationError(err.to_string())
    }
}

/// Result type alias for scratchbuild operations
pub type Result<T> = std::result::Result<T, ScratchError>;
