//! Session key derivation
//!
//! HKDF-SHA256 with no salt: both sides derive the same key from the KEM
//! shared secret without exchanging anything further. The context string is
//! bound in as HKDF `info`, so session keys never collide with other material
//! derived from the same secret.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::{CryptoError, CryptoResult, KEY_SIZE, SessionKey};

/// Derive a 32-byte session key from a KEM shared secret
pub fn derive(shared_secret: &[u8], context: &str) -> CryptoResult<SessionKey> {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut okm = [0u8; KEY_SIZE];
    hk.expand(context.as_bytes(), &mut okm)
        .map_err(|_| CryptoError::Derivation)?;
    let key = SessionKey::from_bytes(okm);
    // `okm` was copied into the key; wipe the stack copy
    zeroize::Zeroize::zeroize(&mut okm);
    Ok(key)
}
