use thiserror::Error;

/// Top-level error type for the Growlog service.
///
/// Storage and auth failures are carried as strings so that the crates
/// below the API layer do not leak their dependency types upward. The
/// `?` operator works across crate boundaries through the `From` impls.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GrowlogError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GrowlogError {
    /// Shorthand for a [`GrowlogError::NotFound`] on the given entity.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        GrowlogError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<toml::de::Error> for GrowlogError {
    fn from(err: toml::de::Error) -> Self {
        GrowlogError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for GrowlogError {
    fn from(err: toml::ser::Error) -> Self {
        GrowlogError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for GrowlogError {
    fn from(err: serde_json::Error) -> Self {
        GrowlogError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Growlog operations.
pub type Result<T> = std::result::Result<T, GrowlogError>;
