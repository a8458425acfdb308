use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Layer {0} not found")]
    LayerNotFound(Uuid),
    #[error("Block {0} not found")]
    BlockNotFound(Uuid),
    #[error("Keyframe {0} not found")]
    KeyframeNotFound(Uuid),
    #[error("Layer {0} is locked")]
    LayerLocked(Uuid),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Backend does not provide `{0}`")]
    CapabilityMissing(&'static str),
    #[error("Cannot {action} while {mode}")]
    ModeConflict {
        action: &'static str,
        mode: &'static str,
    },
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl LibraryError {
    pub fn is_capability_missing(&self) -> bool {
        matches!(self, LibraryError::CapabilityMissing(_))
    }
}

/// Turns a missing backend capability into `Ok(None)` so callers can return early.
pub fn tolerate_missing<T>(result: Result<T, LibraryError>) -> Result<Option<T>, LibraryError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(LibraryError::CapabilityMissing(name)) => {
            log::warn!("Skipping operation: backend does not provide `{}`", name);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
