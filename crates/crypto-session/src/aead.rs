//! AEAD codec for transport payloads
//!
//! Every call to [`AeadCodec::encrypt`] draws a fresh random 96-bit nonce, so
//! a (key, nonce) pair is never reused. Ciphertexts carry the 16-byte tag
//! appended, as produced by the underlying cipher.

use aes_gcm::Aes256Gcm;
use chacha20poly1305::ChaCha20Poly1305;
use chacha20poly1305::aead::{Aead, KeyInit};
use rand::RngCore;
use rand::rngs::OsRng;
use shared_protocol::EncryptedPayload;
use zeroize::Zeroizing;

use crate::{AeadAlgorithm, CryptoError, CryptoResult, KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/// 256-bit symmetric session key, wiped on drop
#[derive(Clone)]
pub struct SessionKey(Zeroizing<[u8; KEY_SIZE]>);

impl SessionKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn try_from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// Nonce and tagged ciphertext produced by one encryption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with the authentication tag appended
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn from_parts(nonce: &[u8], ciphertext: Vec<u8>) -> CryptoResult<Self> {
        let nonce: [u8; NONCE_SIZE] =
            nonce
                .try_into()
                .map_err(|_| CryptoError::InvalidNonceLength {
                    expected: NONCE_SIZE,
                    actual: nonce.len(),
                })?;
        Ok(Self { nonce, ciphertext })
    }

    /// Base64 form for the wire
    pub fn to_payload(&self) -> EncryptedPayload {
        EncryptedPayload::from_bytes(&self.nonce, &self.ciphertext)
    }
}

impl TryFrom<&EncryptedPayload> for Envelope {
    type Error = CryptoError;

    fn try_from(payload: &EncryptedPayload) -> Result<Self, Self::Error> {
        let nonce = payload.nonce_bytes()?;
        Self::from_parts(&nonce, payload.ciphertext_bytes()?)
    }
}

/// Stateless authenticated encryption over a session key
#[derive(Debug, Clone, Copy, Default)]
pub struct AeadCodec {
    algorithm: AeadAlgorithm,
}

impl AeadCodec {
    pub fn new(algorithm: AeadAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> AeadAlgorithm {
        self.algorithm
    }

    /// Encrypt under a fresh random nonce
    pub fn encrypt(&self, key: &SessionKey, plaintext: &[u8]) -> CryptoResult<Envelope> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let sealed = match self.algorithm {
            AeadAlgorithm::Aes256Gcm => Aes256Gcm::new(key.as_bytes().into())
                .encrypt(aes_gcm::Nonce::from_slice(&nonce), plaintext),
            AeadAlgorithm::ChaCha20Poly1305 => ChaCha20Poly1305::new(key.as_bytes().into())
                .encrypt(chacha20poly1305::Nonce::from_slice(&nonce), plaintext),
        };

        let ciphertext = sealed.map_err(|e| CryptoError::Encryption(e.to_string()))?;
        Ok(Envelope { nonce, ciphertext })
    }

    /// Decrypt and verify
    ///
    /// Any tag mismatch (tampering, wrong key, wrong nonce) yields
    /// [`CryptoError::Authentication`] without saying which part failed.
    pub fn decrypt(&self, key: &SessionKey, nonce: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        if nonce.len() != NONCE_SIZE {
            return Err(CryptoError::InvalidNonceLength {
                expected: NONCE_SIZE,
                actual: nonce.len(),
            });
        }

        if ciphertext.len() < TAG_SIZE {
            return Err(CryptoError::Authentication);
        }

        let opened = match self.algorithm {
            AeadAlgorithm::Aes256Gcm => Aes256Gcm::new(key.as_bytes().into())
                .decrypt(aes_gcm::Nonce::from_slice(nonce), ciphertext),
            AeadAlgorithm::ChaCha20Poly1305 => ChaCha20Poly1305::new(key.as_bytes().into())
                .decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext),
        };

        opened.map_err(|_| CryptoError::Authentication)
    }

    pub fn open(&self, key: &SessionKey, envelope: &Envelope) -> CryptoResult<Vec<u8>> {
        self.decrypt(key, &envelope.nonce, &envelope.ciphertext)
    }
}
