//! Payload ingest/egress
//!
//! The single place where inbound payloads are decrypted and where the
//! plaintext policy is enforced. Nothing leaves [`PayloadAdapter::ingest`]
//! unless it decrypted and authenticated in full.

use std::sync::Arc;

use shared_protocol::{EncryptedPayload, Identity, PayloadFields, ProtocolError, SubmittedPayload};
use tracing::{debug, warn};

use crate::{
    AeadCodec, CryptoError, CryptoResult, Envelope, PlaintextPolicy, SessionKeyStore,
    TransportConfig,
};

/// How a payload reached the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Encrypted,
    Plaintext,
}

/// Plaintext ready for the persistence layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    pub plaintext: String,
    pub mode: TransportMode,
}

/// Applies transport decryption to inbound payloads
#[derive(Debug, Clone)]
pub struct PayloadAdapter {
    store: Arc<SessionKeyStore>,
    codec: AeadCodec,
    policy: PlaintextPolicy,
}

impl PayloadAdapter {
    pub fn new(store: Arc<SessionKeyStore>, config: &TransportConfig) -> Self {
        Self {
            store,
            codec: AeadCodec::new(config.aead_algorithm),
            policy: config.plaintext_policy,
        }
    }

    pub fn policy(&self) -> PlaintextPolicy {
        self.policy
    }

    /// Validate, decrypt if needed, and return the plaintext body
    pub fn ingest(&self, sender: &Identity, fields: &PayloadFields) -> CryptoResult<Ingested> {
        match fields.classify()? {
            SubmittedPayload::Encrypted(payload) => {
                let plaintext = self.decrypt(sender, &payload)?;
                Ok(Ingested {
                    plaintext,
                    mode: TransportMode::Encrypted,
                })
            }
            SubmittedPayload::Plaintext(content) => {
                self.check_plaintext_allowed(sender)?;
                debug!("Accepted plaintext payload from {}", sender);
                Ok(Ingested {
                    plaintext: content,
                    mode: TransportMode::Plaintext,
                })
            }
        }
    }

    fn decrypt(&self, sender: &Identity, payload: &EncryptedPayload) -> CryptoResult<String> {
        let Some(key) = self.store.get(sender) else {
            warn!("Encrypted payload from {} without a session key", sender);
            return Err(CryptoError::MissingSessionKey);
        };

        let envelope = Envelope::try_from(payload)?;
        let bytes = self.codec.open(&key, &envelope).inspect_err(|e| {
            warn!("Rejected encrypted payload from {}: {}", sender, e);
        })?;

        String::from_utf8(bytes).map_err(|_| ProtocolError::InvalidText.into())
    }

    fn check_plaintext_allowed(&self, sender: &Identity) -> CryptoResult<()> {
        match self.policy {
            PlaintextPolicy::Allow => Ok(()),
            PlaintextPolicy::Reject => {
                warn!("Plaintext payload from {} refused by policy", sender);
                Err(CryptoError::PlaintextRejected("encryption is required"))
            }
            PlaintextPolicy::RejectWhenEstablished if self.store.contains(sender) => {
                warn!("Plaintext payload from {} refused: session established", sender);
                Err(CryptoError::PlaintextRejected(
                    "a session key is established for this identity",
                ))
            }
            PlaintextPolicy::RejectWhenEstablished => Ok(()),
        }
    }

    /// Outbound content goes back to its owner as plaintext over the
    /// already-secured channel; there is no re-encryption step.
    pub fn egress(&self, recipient: &Identity, plaintext: String) -> String {
        debug!("Serving plaintext to {}", recipient);
        plaintext
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SessionKey, TAG_SIZE};
    use shared_protocol::encode_bytes;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    fn adapter(policy: PlaintextPolicy) -> (PayloadAdapter, Arc<SessionKeyStore>) {
        let store = Arc::new(SessionKeyStore::new());
        let config = TransportConfig {
            plaintext_policy: policy,
            ..Default::default()
        };
        (PayloadAdapter::new(Arc::clone(&store), &config), store)
    }

    fn sealed(key: &SessionKey, text: &str) -> PayloadFields {
        let envelope = AeadCodec::default().encrypt(key, text.as_bytes()).unwrap();
        PayloadFields::encrypted(envelope.to_payload())
    }

    #[test]
    fn test_encrypted_payload_decrypts() {
        let (adapter, store) = adapter(PlaintextPolicy::Allow);
        let key = SessionKey::from_bytes([9u8; 32]);
        store.put(id("alice"), key.clone());

        let ingested = adapter.ingest(&id("alice"), &sealed(&key, "hello")).unwrap();
        assert_eq!(ingested.plaintext, "hello");
        assert_eq!(ingested.mode, TransportMode::Encrypted);
    }

    #[test]
    fn test_missing_session_key() {
        let (adapter, _) = adapter(PlaintextPolicy::Allow);
        let key = SessionKey::from_bytes([9u8; 32]);
        let err = adapter.ingest(&id("bob"), &sealed(&key, "hello")).unwrap_err();
        assert!(matches!(err, CryptoError::MissingSessionKey));
    }

    #[test]
    fn test_other_identity_key_does_not_decrypt() {
        let (adapter, store) = adapter(PlaintextPolicy::Allow);
        let alice_key = SessionKey::from_bytes([1u8; 32]);
        store.put(id("alice"), alice_key.clone());
        store.put(id("mallory"), SessionKey::from_bytes([2u8; 32]));

        let err = adapter
            .ingest(&id("mallory"), &sealed(&alice_key, "hello"))
            .unwrap_err();
        assert!(matches!(err, CryptoError::Authentication));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let (adapter, store) = adapter(PlaintextPolicy::Allow);
        let key = SessionKey::from_bytes([9u8; 32]);
        store.put(id("alice"), key.clone());

        let mut envelope = AeadCodec::default().encrypt(&key, b"hello").unwrap();
        envelope.ciphertext[0] ^= 0x80;
        let fields = PayloadFields::encrypted(envelope.to_payload());
        let err = adapter.ingest(&id("alice"), &fields).unwrap_err();
        assert!(matches!(err, CryptoError::Authentication));
    }

    #[test]
    fn test_decrypted_bytes_must_be_text() {
        let (adapter, store) = adapter(PlaintextPolicy::Allow);
        let key = SessionKey::from_bytes([9u8; 32]);
        store.put(id("alice"), key.clone());

        let envelope = AeadCodec::default().encrypt(&key, &[0xFF, 0xFE]).unwrap();
        let fields = PayloadFields::encrypted(envelope.to_payload());
        let err = adapter.ingest(&id("alice"), &fields).unwrap_err();
        assert!(matches!(err, CryptoError::Protocol(ProtocolError::InvalidText)));
    }

    #[test]
    fn test_short_ciphertext_rejected() {
        let (adapter, store) = adapter(PlaintextPolicy::Allow);
        store.put(id("alice"), SessionKey::from_bytes([9u8; 32]));
        let fields = PayloadFields::encrypted(EncryptedPayload {
            nonce: encode_bytes(&[0u8; 12]),
            ciphertext: encode_bytes(&[0u8; TAG_SIZE - 1]),
        });
        let err = adapter.ingest(&id("alice"), &fields).unwrap_err();
        assert!(matches!(err, CryptoError::Authentication));
    }

    #[test]
    fn test_plaintext_policies() {
        let alice = id("alice");
        let fields = PayloadFields::plaintext("hi");

        let (allow, store) = adapter(PlaintextPolicy::Allow);
        store.put(alice.clone(), SessionKey::from_bytes([1u8; 32]));
        let ingested = allow.ingest(&alice, &fields).unwrap();
        assert_eq!(ingested.mode, TransportMode::Plaintext);
        assert_eq!(ingested.plaintext, "hi");

        let (reject, _) = adapter(PlaintextPolicy::Reject);
        assert!(matches!(
            reject.ingest(&alice, &fields),
            Err(CryptoError::PlaintextRejected(_))
        ));

        let (when_established, store) = adapter(PlaintextPolicy::RejectWhenEstablished);
        assert!(when_established.ingest(&alice, &fields).is_ok());
        store.put(alice.clone(), SessionKey::from_bytes([1u8; 32]));
        assert!(matches!(
            when_established.ingest(&alice, &fields),
            Err(CryptoError::PlaintextRejected(_))
        ));
    }

    #[test]
    fn test_default_policy_blocks_downgrade() {
        let store = Arc::new(SessionKeyStore::new());
        let adapter = PayloadAdapter::new(Arc::clone(&store), &TransportConfig::default());
        assert_eq!(adapter.policy(), PlaintextPolicy::RejectWhenEstablished);

        let plain = PayloadFields::plaintext("hi");
        let accepted = adapter.ingest(&id("alice"), &plain).unwrap();
        assert_eq!(accepted.mode, TransportMode::Plaintext);

        store.put(id("alice"), SessionKey::from_bytes([9u8; 32]));
        assert!(matches!(
            adapter.ingest(&id("alice"), &plain),
            Err(CryptoError::PlaintextRejected(_))
        ));
        assert!(adapter.ingest(&id("bob"), &plain).is_ok());
    }

    #[test]
    fn test_invalid_shape_rejected_before_crypto() {
        let (adapter, _) = adapter(PlaintextPolicy::Allow);
        let err = adapter
            .ingest(&id("alice"), &PayloadFields::default())
            .unwrap_err();
        assert!(matches!(err, CryptoError::Protocol(ProtocolError::EmptyPayload)));
    }
}
