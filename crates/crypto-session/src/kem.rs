//! ML-KEM key encapsulation (FIPS 203)
//!
//! The server holds exactly one keypair for the lifetime of the process. It
//! is never persisted, so a restart invalidates every session key derived
//! against it.

use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::{CryptoError, CryptoResult, KemAlgorithm, SHARED_SECRET_SIZE};

/// Raw KEM shared secret, wiped on drop
pub struct SharedSecret(Zeroizing<[u8; SHARED_SECRET_SIZE]>);

impl SharedSecret {
    fn new(bytes: [u8; SHARED_SECRET_SIZE]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Byte-level ML-KEM operations for one parameter set
macro_rules! ml_kem_params {
    ($name:ident, $params:ident) => {
        mod $name {
            use fips203::$params as params;
            use fips203::traits::{Decaps, Encaps, KeyGen, SerDes};

            pub(super) const EK_LEN: usize = params::EK_LEN;
            pub(super) const CT_LEN: usize = params::CT_LEN;

            pub(super) fn keygen() -> Result<(Vec<u8>, Vec<u8>), &'static str> {
                let (ek, dk) = params::KG::try_keygen()?;
                Ok((ek.into_bytes().to_vec(), dk.into_bytes().to_vec()))
            }

            pub(super) fn encapsulate(ek: &[u8]) -> Result<(Vec<u8>, [u8; 32]), &'static str> {
                let ek: [u8; params::EK_LEN] = ek
                    .try_into()
                    .map_err(|_| "encapsulation key has the wrong length")?;
                let ek = params::EncapsKey::try_from_bytes(ek)?;
                let (ssk, ct) = ek.try_encaps()?;
                Ok((ct.into_bytes().to_vec(), ssk.into_bytes()))
            }

            pub(super) fn decapsulate(dk: &[u8], ct: &[u8]) -> Result<[u8; 32], &'static str> {
                let ct: [u8; params::CT_LEN] = ct
                    .try_into()
                    .map_err(|_| "ciphertext has the wrong length")?;
                let ct = params::CipherText::try_from_bytes(ct)?;
                let dk: [u8; params::DK_LEN] = dk
                    .try_into()
                    .map_err(|_| "decapsulation key has the wrong length")?;
                let dk = params::DecapsKey::try_from_bytes(dk)?;
                let ssk = dk.try_decaps(&ct)?;
                Ok(ssk.into_bytes())
            }
        }
    };
}

ml_kem_params!(mlkem512, ml_kem_512);
ml_kem_params!(mlkem768, ml_kem_768);
ml_kem_params!(mlkem1024, ml_kem_1024);

impl KemAlgorithm {
    /// Encoded public (encapsulation) key length in bytes
    pub fn public_key_len(&self) -> usize {
        match self {
            Self::MlKem512 => mlkem512::EK_LEN,
            Self::MlKem768 => mlkem768::EK_LEN,
            Self::MlKem1024 => mlkem1024::EK_LEN,
        }
    }

    /// KEM ciphertext length in bytes
    pub fn ciphertext_len(&self) -> usize {
        match self {
            Self::MlKem512 => mlkem512::CT_LEN,
            Self::MlKem768 => mlkem768::CT_LEN,
            Self::MlKem1024 => mlkem1024::CT_LEN,
        }
    }
}

/// Encapsulate against a peer's public key (client side of the handshake)
///
/// Returns the KEM ciphertext to send and the locally computed shared secret.
pub fn encapsulate(
    algorithm: KemAlgorithm,
    public_key: &[u8],
) -> CryptoResult<(Vec<u8>, SharedSecret)> {
    if public_key.len() != algorithm.public_key_len() {
        return Err(CryptoError::InvalidPublicKey);
    }

    let result = match algorithm {
        KemAlgorithm::MlKem512 => mlkem512::encapsulate(public_key),
        KemAlgorithm::MlKem768 => mlkem768::encapsulate(public_key),
        KemAlgorithm::MlKem1024 => mlkem1024::encapsulate(public_key),
    };

    let (ciphertext, secret) =
        result.map_err(|e| CryptoError::Encapsulation(e.to_string()))?;
    Ok((ciphertext, SharedSecret::new(secret)))
}

/// KEM keypair: encoded public key, encoded private key, parameter set
pub struct KemKeypair {
    pub public_key: Vec<u8>,
    private_key: Zeroizing<Vec<u8>>,
    pub algorithm: KemAlgorithm,
}

impl std::fmt::Debug for KemKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KemKeypair")
            .field("algorithm", &self.algorithm)
            .field("public_key_len", &self.public_key.len())
            .finish_non_exhaustive()
    }
}

/// Owner of the server's KEM keypair
#[derive(Debug)]
pub struct KemService {
    keypair: KemKeypair,
}

impl KemService {
    /// Generate the process keypair
    ///
    /// Any failure here must abort startup; there is no fallback to a
    /// non post-quantum mode.
    pub fn generate(algorithm: KemAlgorithm) -> CryptoResult<Self> {
        let generated = match algorithm {
            KemAlgorithm::MlKem512 => mlkem512::keygen(),
            KemAlgorithm::MlKem768 => mlkem768::keygen(),
            KemAlgorithm::MlKem1024 => mlkem1024::keygen(),
        };

        let (public_key, private_key) =
            generated.map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

        let service = Self {
            keypair: KemKeypair {
                public_key,
                private_key: Zeroizing::new(private_key),
                algorithm,
            },
        };
        service.self_test()?;

        info!(
            "Generated {} keypair (public key {} bytes)",
            algorithm,
            service.keypair.public_key.len()
        );

        Ok(service)
    }

    /// Encapsulate against our own public key and check both sides agree
    fn self_test(&self) -> CryptoResult<()> {
        let (ciphertext, expected) = encapsulate(self.algorithm(), self.public_key())
            .map_err(|e| CryptoError::KeyGeneration(format!("self-test encapsulation: {e}")))?;
        let recovered = self
            .decapsulate(&ciphertext)
            .map_err(|e| CryptoError::KeyGeneration(format!("self-test decapsulation: {e}")))?;

        if expected.as_bytes() != recovered.as_bytes() {
            return Err(CryptoError::KeyGeneration(
                "self-test shared secrets disagree".to_string(),
            ));
        }

        debug!("{} self-test passed", self.algorithm());
        Ok(())
    }

    pub fn algorithm(&self) -> KemAlgorithm {
        self.keypair.algorithm
    }

    pub fn public_key(&self) -> &[u8] {
        &self.keypair.public_key
    }

    /// Recover the shared secret from a client's KEM ciphertext
    ///
    /// Malformed ciphertexts fail with [`CryptoError::Decapsulation`]. A
    /// well-formed ciphertext produced against a different key yields an
    /// unrelated secret (ML-KEM implicit rejection); key confirmation in the
    /// handshake is what detects that case.
    pub fn decapsulate(&self, ciphertext: &[u8]) -> CryptoResult<SharedSecret> {
        let algorithm = self.algorithm();
        if ciphertext.len() != algorithm.ciphertext_len() {
            return Err(CryptoError::Decapsulation(format!(
                "expected {} byte ciphertext, got {}",
                algorithm.ciphertext_len(),
                ciphertext.len()
            )));
        }

        let private_key = self.keypair.private_key.as_slice();
        let result = match algorithm {
            KemAlgorithm::MlKem512 => mlkem512::decapsulate(private_key, ciphertext),
            KemAlgorithm::MlKem768 => mlkem768::decapsulate(private_key, ciphertext),
            KemAlgorithm::MlKem1024 => mlkem1024::decapsulate(private_key, ciphertext),
        };

        result
            .map(SharedSecret::new)
            .map_err(|e| CryptoError::Decapsulation(e.to_string()))
    }
}
