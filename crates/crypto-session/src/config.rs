//! Transport security configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CryptoError, SESSION_KEY_CONTEXT};

/// ML-KEM parameter set used for the server keypair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KemAlgorithm {
    #[serde(rename = "ml-kem-512", alias = "kyber512")]
    MlKem512,
    #[serde(rename = "ml-kem-768", alias = "kyber768")]
    MlKem768,
    #[serde(rename = "ml-kem-1024", alias = "kyber1024")]
    MlKem1024,
}

impl KemAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MlKem512 => "ml-kem-512",
            Self::MlKem768 => "ml-kem-768",
            Self::MlKem1024 => "ml-kem-1024",
        }
    }
}

impl Default for KemAlgorithm {
    fn default() -> Self {
        Self::MlKem768
    }
}

impl fmt::Display for KemAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KemAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ml-kem-512" | "kyber512" => Ok(Self::MlKem512),
            "ml-kem-768" | "kyber768" => Ok(Self::MlKem768),
            "ml-kem-1024" | "kyber1024" => Ok(Self::MlKem1024),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// AEAD cipher applied to payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AeadAlgorithm {
    #[serde(rename = "aes-256-gcm", alias = "aes256gcm")]
    Aes256Gcm,
    #[serde(rename = "chacha20-poly1305", alias = "chacha20poly1305")]
    ChaCha20Poly1305,
}

impl AeadAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aes-256-gcm",
            Self::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }
}

impl Default for AeadAlgorithm {
    fn default() -> Self {
        Self::Aes256Gcm
    }
}

impl fmt::Display for AeadAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AeadAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-256-gcm" | "aes256gcm" => Ok(Self::Aes256Gcm),
            "chacha20-poly1305" | "chacha20poly1305" => Ok(Self::ChaCha20Poly1305),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// What to do with payloads submitted as plaintext
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaintextPolicy {
    /// Pass plaintext through unchanged
    Allow,
    /// Refuse plaintext from identities that hold a session key
    RejectWhenEstablished,
    /// Refuse all plaintext
    Reject,
}

impl PlaintextPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::RejectWhenEstablished => "reject-when-established",
            Self::Reject => "reject",
        }
    }
}

/// Plaintext still flows for identities without a channel, but an
/// established identity cannot fall back to it
impl Default for PlaintextPolicy {
    fn default() -> Self {
        Self::RejectWhenEstablished
    }
}

impl fmt::Display for PlaintextPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaintextPolicy {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "reject-when-established" => Ok(Self::RejectWhenEstablished),
            "reject" => Ok(Self::Reject),
            other => Err(CryptoError::Configuration(format!(
                "unknown plaintext policy `{other}`"
            ))),
        }
    }
}

/// Transport security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// KEM parameter set for the server keypair
    pub kem_algorithm: KemAlgorithm,
    /// AEAD cipher for payloads
    pub aead_algorithm: AeadAlgorithm,
    /// HKDF info string bound into every session key
    pub kdf_context: String,
    /// Session keys older than this are treated as absent
    pub session_ttl: Option<Duration>,
    pub plaintext_policy: PlaintextPolicy,
    /// Handshakes must carry a key confirmation; without one a ciphertext
    /// made for another keypair cannot be told apart from a valid one
    pub require_key_confirmation: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kem_algorithm: KemAlgorithm::default(),
            aead_algorithm: AeadAlgorithm::default(),
            kdf_context: SESSION_KEY_CONTEXT.to_string(),
            session_ttl: None,
            plaintext_policy: PlaintextPolicy::default(),
            require_key_confirmation: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_names_parse() {
        assert_eq!("ML-KEM-512".parse::<KemAlgorithm>().unwrap(), KemAlgorithm::MlKem512);
        assert_eq!("kyber1024".parse::<KemAlgorithm>().unwrap(), KemAlgorithm::MlKem1024);
        assert!("rsa-2048".parse::<KemAlgorithm>().is_err());

        assert_eq!(
            "chacha20-poly1305".parse::<AeadAlgorithm>().unwrap(),
            AeadAlgorithm::ChaCha20Poly1305
        );
        assert_eq!(
            "reject-when-established".parse::<PlaintextPolicy>().unwrap(),
            PlaintextPolicy::RejectWhenEstablished
        );
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: TransportConfig =
            serde_json::from_str(r#"{"kem_algorithm":"ml-kem-1024"}"#).unwrap();
        assert_eq!(config.kem_algorithm, KemAlgorithm::MlKem1024);
        assert_eq!(config.aead_algorithm, AeadAlgorithm::Aes256Gcm);
        assert_eq!(config.kdf_context, SESSION_KEY_CONTEXT);
        assert_eq!(config.plaintext_policy, PlaintextPolicy::RejectWhenEstablished);
        assert!(config.require_key_confirmation);
    }

    #[test]
    fn test_serde_names_match_display() {
        for algorithm in [KemAlgorithm::MlKem512, KemAlgorithm::MlKem768, KemAlgorithm::MlKem1024] {
            let json = serde_json::to_string(&algorithm).unwrap();
            assert_eq!(json, format!("\"{}\"", algorithm.as_str()));
            assert_eq!(serde_json::from_str::<KemAlgorithm>(&json).unwrap(), algorithm);
            assert_eq!(algorithm.as_str().parse::<KemAlgorithm>().unwrap(), algorithm);
        }
        for algorithm in [AeadAlgorithm::Aes256Gcm, AeadAlgorithm::ChaCha20Poly1305] {
            let json = serde_json::to_string(&algorithm).unwrap();
            assert_eq!(json, format!("\"{}\"", algorithm.as_str()));
            assert_eq!(serde_json::from_str::<AeadAlgorithm>(&json).unwrap(), algorithm);
            assert_eq!(algorithm.as_str().parse::<AeadAlgorithm>().unwrap(), algorithm);
        }
        for policy in [
            PlaintextPolicy::Allow,
            PlaintextPolicy::RejectWhenEstablished,
            PlaintextPolicy::Reject,
        ] {
            let json = serde_json::to_string(&policy).unwrap();
            assert_eq!(json, format!("\"{}\"", policy.as_str()));
            assert_eq!(policy.as_str().parse::<PlaintextPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_legacy_kyber_names_deserialize() {
        let config: TransportConfig = serde_json::from_str(
            r#"{"kem_algorithm":"kyber512","aead_algorithm":"chacha20-poly1305"}"#,
        )
        .unwrap();
        assert_eq!(config.kem_algorithm, KemAlgorithm::MlKem512);
        assert_eq!(config.aead_algorithm, AeadAlgorithm::ChaCha20Poly1305);
    }
}
