//! Handshake and session management messages

use serde::{Deserialize, Serialize};

use crate::{EncryptedPayload, ProtocolError, ProtocolResult, decode_bytes};

/// Opaque identity of an authenticated caller
///
/// Issued by the upstream authentication layer; the transport core only uses
/// it as a lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Build an identity, rejecting blank values
    pub fn new(id: impl Into<String>) -> ProtocolResult<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ProtocolError::InvalidIdentity);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl std::str::FromStr for Identity {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Server public key exposure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    /// Base64-encoded KEM encapsulation key
    pub public_key: String,
    /// KEM parameter set identifier, e.g. `ml-kem-768`
    pub algorithm: String,
}

impl PublicKeyResponse {
    pub fn public_key_bytes(&self) -> ProtocolResult<Vec<u8>> {
        decode_bytes("public_key", &self.public_key)
    }
}

/// Handshake submission from an authenticated client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Base64-encoded KEM ciphertext
    pub ciphertext: String,
    /// Proof that the client holds the derived session key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<EncryptedPayload>,
}

impl HandshakeRequest {
    pub fn ciphertext_bytes(&self) -> ProtocolResult<Vec<u8>> {
        decode_bytes("ciphertext", &self.ciphertext)
    }
}

/// Handshake result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    pub status: String,
    pub message: String,
}

impl HandshakeResponse {
    pub fn established() -> Self {
        Self {
            status: "ok".to_string(),
            message: "Handshake successful. Session key established.".to_string(),
        }
    }
}

/// Whether the caller currently holds a session key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub established: bool,
    pub algorithm: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_rejects_blank() {
        assert!(Identity::new("   ").is_err());
        assert_eq!(Identity::new(" alice ").unwrap().as_str(), "alice");
        assert!(serde_json::from_str::<Identity>(r#""""#).is_err());
    }

    #[test]
    fn test_handshake_request_without_confirmation() {
        let request: HandshakeRequest = serde_json::from_str(r#"{"ciphertext":"AAEC"}"#).unwrap();
        assert!(request.confirmation.is_none());
        assert_eq!(request.ciphertext_bytes().unwrap(), vec![0, 1, 2]);

        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("confirmation"));
    }
}
