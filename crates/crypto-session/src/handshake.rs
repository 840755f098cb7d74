//! Handshake coordination
//!
//! Per identity the only states are `NoSession` and `Established`. A
//! successful handshake always lands in `Established` (replacing any prior
//! key); a failed one leaves the store exactly as it was.
//!
//! ML-KEM decapsulation never fails on a well-formed ciphertext made for
//! another keypair, so only a key confirmation can tell such a handshake
//! apart. An unconfirmed handshake is never allowed to replace a key.

use std::sync::Arc;

use shared_protocol::{
    HandshakeRequest, HandshakeResponse, Identity, ProtocolError, PublicKeyResponse,
    SessionStatusResponse, encode_bytes,
};
use tracing::{info, warn};

use crate::{
    AeadCodec, CryptoError, CryptoResult, Envelope, KEY_CONFIRMATION_LABEL, KemService,
    SessionKey, SessionKeyStore, TransportConfig, kdf,
};

/// Handshake state of one identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Established,
}

/// Orchestrates public-key exposure, decapsulation, derivation and storage
#[derive(Debug, Clone)]
pub struct HandshakeCoordinator {
    kem: Arc<KemService>,
    store: Arc<SessionKeyStore>,
    codec: AeadCodec,
    kdf_context: String,
    require_confirmation: bool,
}

impl HandshakeCoordinator {
    pub fn new(kem: Arc<KemService>, store: Arc<SessionKeyStore>, config: &TransportConfig) -> Self {
        Self {
            kem,
            store,
            codec: AeadCodec::new(config.aead_algorithm),
            kdf_context: config.kdf_context.clone(),
            require_confirmation: config.require_key_confirmation,
        }
    }

    /// Server public key, base64-encoded for transport
    pub fn public_key_response(&self) -> PublicKeyResponse {
        PublicKeyResponse {
            public_key: encode_bytes(self.kem.public_key()),
            algorithm: self.kem.algorithm().to_string(),
        }
    }

    /// Decode a wire handshake request and establish a session for `identity`
    pub fn handshake(
        &self,
        identity: &Identity,
        request: &HandshakeRequest,
    ) -> CryptoResult<HandshakeResponse> {
        let ciphertext = request.ciphertext_bytes()?;
        let confirmation = request
            .confirmation
            .as_ref()
            .map(Envelope::try_from)
            .transpose()?;

        self.establish(identity, &ciphertext, confirmation.as_ref())?;
        Ok(HandshakeResponse::established())
    }

    /// Decapsulate, derive and store
    ///
    /// When a confirmation envelope is supplied it must open under the derived
    /// key to the confirmation label, otherwise the ciphertext is treated as
    /// not belonging to our keypair.
    pub fn establish(
        &self,
        identity: &Identity,
        ciphertext: &[u8],
        confirmation: Option<&Envelope>,
    ) -> CryptoResult<()> {
        if confirmation.is_none() {
            if self.require_confirmation {
                warn!("Handshake from {} rejected: missing key confirmation", identity);
                return Err(ProtocolError::MissingField("confirmation").into());
            }
            if self.store.contains(identity) {
                warn!(
                    "Handshake from {} rejected: unconfirmed handshake over an established session",
                    identity
                );
                return Err(ProtocolError::MissingField("confirmation").into());
            }
        }

        let key = match self.derive_key(ciphertext, confirmation) {
            Ok(key) => key,
            Err(e) => {
                warn!("Handshake from {} rejected: {}", identity, e);
                return Err(e);
            }
        };

        self.store.put(identity.clone(), key);
        info!(
            "Established session key for {} ({})",
            identity,
            self.kem.algorithm()
        );
        Ok(())
    }

    fn derive_key(
        &self,
        ciphertext: &[u8],
        confirmation: Option<&Envelope>,
    ) -> CryptoResult<SessionKey> {
        let shared_secret = self.kem.decapsulate(ciphertext)?;
        let key = kdf::derive(shared_secret.as_bytes(), &self.kdf_context)?;

        if let Some(envelope) = confirmation {
            match self.codec.open(&key, envelope) {
                Ok(label) if label == KEY_CONFIRMATION_LABEL => {}
                _ => {
                    return Err(CryptoError::Decapsulation(
                        "key confirmation failed".to_string(),
                    ));
                }
            }
        }

        Ok(key)
    }

    pub fn session_state(&self, identity: &Identity) -> SessionState {
        if self.store.contains(identity) {
            SessionState::Established
        } else {
            SessionState::NoSession
        }
    }

    pub fn session_status(&self, identity: &Identity) -> SessionStatusResponse {
        SessionStatusResponse {
            established: self.session_state(identity) == SessionState::Established,
            algorithm: self.kem.algorithm().to_string(),
        }
    }

    /// Forget the identity's session key
    pub fn logout(&self, identity: &Identity) -> bool {
        self.store.remove(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientSession, KemAlgorithm};

    fn build(config: TransportConfig) -> (HandshakeCoordinator, Arc<SessionKeyStore>) {
        let kem = Arc::new(KemService::generate(config.kem_algorithm).unwrap());
        let store = Arc::new(SessionKeyStore::with_ttl(config.session_ttl));
        (HandshakeCoordinator::new(kem, Arc::clone(&store), &config), store)
    }

    fn alice() -> Identity {
        Identity::new("alice").unwrap()
    }

    #[test]
    fn test_public_key_response_round_trips() {
        let (coordinator, _) = build(TransportConfig::default());
        let response = coordinator.public_key_response();
        assert_eq!(response.algorithm, "ml-kem-768");
        assert_eq!(
            response.public_key_bytes().unwrap().len(),
            KemAlgorithm::MlKem768.public_key_len()
        );
    }

    #[test]
    fn test_handshake_stores_client_key() {
        let config = TransportConfig::default();
        let (coordinator, store) = build(config.clone());
        let client = ClientSession::connect(&coordinator.public_key_response(), &config).unwrap();

        assert_eq!(coordinator.session_state(&alice()), SessionState::NoSession);
        let response = coordinator
            .handshake(&alice(), &client.handshake_request().unwrap())
            .unwrap();
        assert_eq!(response.status, "ok");
        assert_eq!(coordinator.session_state(&alice()), SessionState::Established);
        assert_eq!(
            store.get(&alice()).unwrap().as_bytes(),
            client.session_key().as_bytes()
        );
    }

    #[test]
    fn test_rehandshake_replaces_key() {
        let config = TransportConfig::default();
        let (coordinator, store) = build(config.clone());
        let pk = coordinator.public_key_response();

        let first = ClientSession::connect(&pk, &config).unwrap();
        let second = ClientSession::connect(&pk, &config).unwrap();
        coordinator
            .handshake(&alice(), &first.handshake_request().unwrap())
            .unwrap();
        coordinator
            .handshake(&alice(), &second.handshake_request().unwrap())
            .unwrap();

        assert_eq!(
            store.get(&alice()).unwrap().as_bytes(),
            second.session_key().as_bytes()
        );
    }

    #[test]
    fn test_failed_rehandshake_keeps_previous_key() {
        let config = TransportConfig::default();
        let (coordinator, store) = build(config.clone());
        let client = ClientSession::connect(&coordinator.public_key_response(), &config).unwrap();
        coordinator
            .handshake(&alice(), &client.handshake_request().unwrap())
            .unwrap();

        let mut bad = client.handshake_request().unwrap();
        bad.ciphertext = encode_bytes(&[1, 2, 3]);
        let err = coordinator.handshake(&alice(), &bad).unwrap_err();
        assert!(matches!(err, CryptoError::Decapsulation(_)));
        assert_eq!(
            store.get(&alice()).unwrap().as_bytes(),
            client.session_key().as_bytes()
        );
    }

    #[test]
    fn test_failed_handshake_leaves_no_session() {
        let (coordinator, store) = build(TransportConfig::default());
        let bad = HandshakeRequest {
            ciphertext: "not base64!".to_string(),
            confirmation: None,
        };
        let err = coordinator.handshake(&alice(), &bad).unwrap_err();
        assert!(matches!(err, CryptoError::Protocol(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_confirmation_detects_foreign_ciphertext() {
        let config = TransportConfig::default();
        let (coordinator, store) = build(config.clone());
        let (other, _) = build(config.clone());

        // Client talked to a different server keypair
        let client = ClientSession::connect(&other.public_key_response(), &config).unwrap();
        let request = client.handshake_request().unwrap();

        let err = coordinator.handshake(&alice(), &request).unwrap_err();
        assert!(matches!(err, CryptoError::Decapsulation(_)));
        assert!(store.get(&alice()).is_none());
    }

    #[test]
    fn test_confirmation_required_by_default() {
        let config = TransportConfig::default();
        let (coordinator, store) = build(config.clone());
        let client = ClientSession::connect(&coordinator.public_key_response(), &config).unwrap();

        let err = coordinator
            .handshake(&alice(), &client.unconfirmed_handshake_request())
            .unwrap_err();
        assert!(matches!(
            err,
            CryptoError::Protocol(ProtocolError::MissingField("confirmation"))
        ));
        assert!(store.is_empty());

        coordinator
            .handshake(&alice(), &client.handshake_request().unwrap())
            .unwrap();
        assert_eq!(coordinator.session_state(&alice()), SessionState::Established);
    }

    #[test]
    fn test_foreign_rehandshake_keeps_previous_key() {
        let config = TransportConfig::default();
        let (coordinator, store) = build(config.clone());
        let (other, _) = build(config.clone());
        let client = ClientSession::connect(&coordinator.public_key_response(), &config).unwrap();
        coordinator
            .handshake(&alice(), &client.handshake_request().unwrap())
            .unwrap();

        let foreign = ClientSession::connect(&other.public_key_response(), &config).unwrap();
        assert!(coordinator
            .handshake(&alice(), &foreign.handshake_request().unwrap())
            .is_err());
        assert!(coordinator
            .handshake(&alice(), &foreign.unconfirmed_handshake_request())
            .is_err());

        assert_eq!(
            store.get(&alice()).unwrap().as_bytes(),
            client.session_key().as_bytes()
        );
    }

    #[test]
    fn test_unconfirmed_handshake_cannot_replace_key() {
        let config = TransportConfig {
            require_key_confirmation: false,
            ..Default::default()
        };
        let (coordinator, store) = build(config.clone());
        let pk = coordinator.public_key_response();
        let first = ClientSession::connect(&pk, &config).unwrap();
        let second = ClientSession::connect(&pk, &config).unwrap();

        coordinator
            .handshake(&alice(), &first.unconfirmed_handshake_request())
            .unwrap();
        let err = coordinator
            .handshake(&alice(), &second.unconfirmed_handshake_request())
            .unwrap_err();
        assert!(matches!(
            err,
            CryptoError::Protocol(ProtocolError::MissingField("confirmation"))
        ));
        assert_eq!(
            store.get(&alice()).unwrap().as_bytes(),
            first.session_key().as_bytes()
        );

        coordinator
            .handshake(&alice(), &second.handshake_request().unwrap())
            .unwrap();
        assert_eq!(
            store.get(&alice()).unwrap().as_bytes(),
            second.session_key().as_bytes()
        );
    }

    #[test]
    fn test_logout_clears_session() {
        let config = TransportConfig::default();
        let (coordinator, _) = build(config.clone());
        let client = ClientSession::connect(&coordinator.public_key_response(), &config).unwrap();
        coordinator
            .handshake(&alice(), &client.handshake_request().unwrap())
            .unwrap();

        assert!(coordinator.logout(&alice()));
        assert!(!coordinator.session_status(&alice()).established);
    }

    #[test]
    fn test_concurrent_handshakes_do_not_cross_assign() {
        let config = TransportConfig::default();
        let (coordinator, store) = build(config.clone());
        let pk = coordinator.public_key_response();

        let clients: Vec<(Identity, ClientSession)> = (0..16)
            .map(|i| {
                (
                    Identity::new(format!("user-{i}")).unwrap(),
                    ClientSession::connect(&pk, &config).unwrap(),
                )
            })
            .collect();

        std::thread::scope(|scope| {
            for (identity, client) in &clients {
                let coordinator = &coordinator;
                scope.spawn(move || {
                    coordinator
                        .handshake(identity, &client.handshake_request().unwrap())
                        .unwrap();
                });
            }
        });

        for (identity, client) in &clients {
            assert_eq!(
                store.get(identity).unwrap().as_bytes(),
                client.session_key().as_bytes()
            );
        }
    }
}
