use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decryption failed: wrong password or corrupted file")]
    DecryptionFailed,

    #[error("key derivation error: {0}")]
    KeyDerivation(String),

    #[error("invalid backup envelope: {0}")]
    InvalidEnvelope(String),

    #[error("invalid backup payload: {0}")]
    InvalidPayload(String),

    #[error("secure random source unavailable: {0}")]
    Rng(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("invalid meta entry '{0}'")]
    InvalidMeta(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
