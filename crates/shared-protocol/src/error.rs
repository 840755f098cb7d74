//! Error types for the protocol

use thiserror::Error;

/// Protocol error
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid base64 in field `{field}`")]
    InvalidEncoding { field: &'static str },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Payload must carry either `content` or both `nonce` and `ciphertext`")]
    EmptyPayload,

    #[error("Payload cannot carry both plaintext `content` and an encrypted envelope")]
    AmbiguousPayload,

    #[error("Invalid identity")]
    InvalidIdentity,

    #[error("Payload is not valid UTF-8 text")]
    InvalidText,
}

/// Result type alias for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
