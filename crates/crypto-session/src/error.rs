//! Crypto session error types

use shared_protocol::ProtocolError;
use thiserror::Error;

/// Cryptographic operation error
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Encapsulation failed: {0}")]
    Encapsulation(String),

    #[error("Decapsulation failed: {0}")]
    Decapsulation(String),

    #[error("Key derivation failed")]
    Derivation,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: authentication tag mismatch")]
    Authentication,

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },

    #[error("No session key established for this identity")]
    MissingSessionKey,

    #[error("Plaintext payloads are not accepted: {0}")]
    PlaintextRejected(&'static str),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl CryptoError {
    /// Startup failures (key generation, configuration) abort the process;
    /// everything else is local to one request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::KeyGeneration(_) | Self::UnsupportedAlgorithm(_) | Self::Configuration(_)
        )
    }

    /// Stable, client-facing name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::KeyGeneration(_) | Self::UnsupportedAlgorithm(_) => "key_generation_failure",
            Self::Configuration(_) => "configuration_error",
            Self::InvalidPublicKey | Self::Encapsulation(_) => "encapsulation_failure",
            Self::Decapsulation(_) => "decapsulation_failure",
            Self::Derivation => "derivation_failure",
            Self::Encryption(_) => "encryption_failure",
            Self::Authentication => "authentication_failure",
            Self::InvalidKeyLength { .. } | Self::InvalidNonceLength { .. } => "invalid_format",
            Self::MissingSessionKey => "missing_session_key",
            Self::PlaintextRejected(_) => "plaintext_rejected",
            Self::Protocol(_) => "invalid_payload",
        }
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
