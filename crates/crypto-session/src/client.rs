//! Client side of the handshake
//!
//! Mirrors the server primitives: real ML-KEM encapsulation against the
//! published public key, the same HKDF derivation, and the same AEAD codec.

use shared_protocol::{EncryptedPayload, HandshakeRequest, PayloadFields, PublicKeyResponse, encode_bytes};

use crate::{
    AeadCodec, CryptoResult, Envelope, KEY_CONFIRMATION_LABEL, KemAlgorithm, SessionKey,
    TransportConfig, kdf, kem,
};

/// Session established by a client against a server public key
#[derive(Debug)]
pub struct ClientSession {
    algorithm: KemAlgorithm,
    kem_ciphertext: Vec<u8>,
    key: SessionKey,
    codec: AeadCodec,
}

impl ClientSession {
    /// Encapsulate against the server's published key and derive the session key
    ///
    /// The parameter set is taken from the server's response; the AEAD cipher
    /// and KDF context come from the shared configuration.
    pub fn connect(server: &PublicKeyResponse, config: &TransportConfig) -> CryptoResult<Self> {
        let algorithm: KemAlgorithm = server.algorithm.parse()?;
        let public_key = server.public_key_bytes()?;

        let (kem_ciphertext, shared_secret) = kem::encapsulate(algorithm, &public_key)?;
        let key = kdf::derive(shared_secret.as_bytes(), &config.kdf_context)?;

        Ok(Self {
            algorithm,
            kem_ciphertext,
            key,
            codec: AeadCodec::new(config.aead_algorithm),
        })
    }

    pub fn algorithm(&self) -> KemAlgorithm {
        self.algorithm
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.key
    }

    /// Handshake submission proving possession of the derived key
    pub fn handshake_request(&self) -> CryptoResult<HandshakeRequest> {
        let confirmation = self.codec.encrypt(&self.key, KEY_CONFIRMATION_LABEL)?;
        Ok(HandshakeRequest {
            ciphertext: encode_bytes(&self.kem_ciphertext),
            confirmation: Some(confirmation.to_payload()),
        })
    }

    /// Handshake submission carrying only the KEM ciphertext, for servers
    /// that do not require key confirmation
    pub fn unconfirmed_handshake_request(&self) -> HandshakeRequest {
        HandshakeRequest {
            ciphertext: encode_bytes(&self.kem_ciphertext),
            confirmation: None,
        }
    }

    pub fn seal(&self, plaintext: &[u8]) -> CryptoResult<EncryptedPayload> {
        Ok(self.codec.encrypt(&self.key, plaintext)?.to_payload())
    }

    /// Encrypted body fields for a message or document submission
    pub fn seal_fields(&self, text: &str) -> CryptoResult<PayloadFields> {
        Ok(PayloadFields::encrypted(self.seal(text.as_bytes())?))
    }

    pub fn open(&self, payload: &EncryptedPayload) -> CryptoResult<Vec<u8>> {
        let envelope = Envelope::try_from(payload)?;
        self.codec.open(&self.key, &envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CryptoError, KemService};

    fn server_response(algorithm: KemAlgorithm) -> PublicKeyResponse {
        let service = KemService::generate(algorithm).unwrap();
        PublicKeyResponse {
            public_key: encode_bytes(service.public_key()),
            algorithm: algorithm.to_string(),
        }
    }

    #[test]
    fn test_connect_uses_announced_algorithm() {
        let client = ClientSession::connect(
            &server_response(KemAlgorithm::MlKem1024),
            &TransportConfig::default(),
        )
        .unwrap();
        assert_eq!(client.algorithm(), KemAlgorithm::MlKem1024);
        assert_eq!(
            client
                .unconfirmed_handshake_request()
                .ciphertext_bytes()
                .unwrap()
                .len(),
            KemAlgorithm::MlKem1024.ciphertext_len()
        );
    }

    #[test]
    fn test_handshake_request_carries_confirmation() {
        let client = ClientSession::connect(
            &server_response(KemAlgorithm::MlKem768),
            &TransportConfig::default(),
        )
        .unwrap();
        let request = client.handshake_request().unwrap();
        let confirmation = request.confirmation.expect("confirmation");
        assert_eq!(client.open(&confirmation).unwrap(), KEY_CONFIRMATION_LABEL);
        assert!(client.unconfirmed_handshake_request().confirmation.is_none());
    }

    #[test]
    fn test_seal_open() {
        let client = ClientSession::connect(
            &server_response(KemAlgorithm::MlKem512),
            &TransportConfig::default(),
        )
        .unwrap();
        let sealed = client.seal(b"hello").unwrap();
        assert_eq!(client.open(&sealed).unwrap(), b"hello");
    }

    #[test]
    fn test_connect_rejects_bad_responses() {
        let config = TransportConfig::default();

        let mut unknown = server_response(KemAlgorithm::MlKem512);
        unknown.algorithm = "x25519".to_string();
        assert!(matches!(
            ClientSession::connect(&unknown, &config),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));

        // Announced parameter set does not match the key size
        let mut mismatched = server_response(KemAlgorithm::MlKem512);
        mismatched.algorithm = "ml-kem-768".to_string();
        assert!(matches!(
            ClientSession::connect(&mismatched, &config),
            Err(CryptoError::InvalidPublicKey)
        ));
    }
}
