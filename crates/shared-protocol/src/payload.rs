//! Application payload submissions (messages and documents)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Identity, ProtocolError, ProtocolResult, decode_bytes, encode_bytes};

/// Nonce and ciphertext (tag appended), base64-encoded for transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub nonce: String,
    pub ciphertext: String,
}

impl EncryptedPayload {
    pub fn from_bytes(nonce: &[u8], ciphertext: &[u8]) -> Self {
        Self {
            nonce: encode_bytes(nonce),
            ciphertext: encode_bytes(ciphertext),
        }
    }

    pub fn nonce_bytes(&self) -> ProtocolResult<Vec<u8>> {
        decode_bytes("nonce", &self.nonce)
    }

    pub fn ciphertext_bytes(&self) -> ProtocolResult<Vec<u8>> {
        decode_bytes("ciphertext", &self.ciphertext)
    }
}

/// Body fields of a payload submission as they arrive on the wire
///
/// Exactly one form is valid: non-blank `content`, or both `nonce` and
/// `ciphertext`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ciphertext: Option<String>,
}

impl PayloadFields {
    pub fn plaintext(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn encrypted(payload: EncryptedPayload) -> Self {
        Self {
            content: None,
            nonce: Some(payload.nonce),
            ciphertext: Some(payload.ciphertext),
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.nonce.is_some() && self.ciphertext.is_some()
    }

    /// Validate the field combination and classify the payload
    pub fn classify(&self) -> ProtocolResult<SubmittedPayload> {
        let has_content = self
            .content
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());

        match (&self.nonce, &self.ciphertext) {
            (Some(nonce), Some(ciphertext)) => {
                if has_content {
                    return Err(ProtocolError::AmbiguousPayload);
                }
                Ok(SubmittedPayload::Encrypted(EncryptedPayload {
                    nonce: nonce.clone(),
                    ciphertext: ciphertext.clone(),
                }))
            }
            (Some(_), None) => Err(ProtocolError::MissingField("ciphertext")),
            (None, Some(_)) => Err(ProtocolError::MissingField("nonce")),
            (None, None) => match &self.content {
                Some(content) if has_content => Ok(SubmittedPayload::Plaintext(content.clone())),
                _ => Err(ProtocolError::EmptyPayload),
            },
        }
    }
}

/// A validated payload submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmittedPayload {
    Plaintext(String),
    Encrypted(EncryptedPayload),
}

/// Chat message submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSubmission {
    pub recipient_id: Identity,
    #[serde(flatten)]
    pub payload: PayloadFields,
}

/// Document submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSubmission {
    pub title: String,
    #[serde(flatten)]
    pub payload: PayloadFields,
}

/// Stored message, returned to its owner in plaintext
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub sender_id: Identity,
    pub recipient_id: Identity,
    pub content: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

/// Stored document, returned to its owner in plaintext
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub owner_id: Identity,
    pub title: String,
    pub content: String,
    pub timestamp: u64,
}
