//! Error taxonomy shared by the repository, the service and both protocol adapters.

use uuid::Uuid;

pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

/// Coarse classification of a [RegistryError]. Adapters map on this, never on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Duplicate,
    InvalidInput,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("model not found")]
    NotFound,

    #[error("model {name}:{version} already exists")]
    Duplicate { name: String, version: String },

    #[error("version {version} already recorded for model {model_id}")]
    DuplicateVersion { model_id: Uuid, version: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage failure")]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RegistryError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound => ErrorKind::NotFound,
            Self::Duplicate { .. } | Self::DuplicateVersion { .. } => ErrorKind::Duplicate,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Storage(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Parse a wire identifier. Anything that is not a UUID cannot name a model.
pub fn parse_model_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| RegistryError::NotFound)
}
