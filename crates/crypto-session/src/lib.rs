//! Crypto Session - post-quantum transport security
//!
//! ML-KEM key encapsulation establishes a per-identity session key (via
//! HKDF-SHA256), which an AEAD codec then uses to protect application
//! payloads between an authenticated client and the server.

pub mod aead;
pub mod client;
mod config;
mod error;
pub mod handshake;
pub mod ingest;
pub mod kdf;
pub mod kem;
pub mod store;

pub use aead::{AeadCodec, Envelope, SessionKey};
pub use client::ClientSession;
pub use config::*;
pub use error::*;
pub use handshake::{HandshakeCoordinator, SessionState};
pub use ingest::{Ingested, PayloadAdapter, TransportMode};
pub use kem::{KemKeypair, KemService, SharedSecret};
pub use store::SessionKeyStore;

/// Nonce size for AES-256-GCM and ChaCha20Poly1305 (96 bits / 12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (128 bits / 16 bytes)
pub const TAG_SIZE: usize = 16;

/// Session key size (256 bits / 32 bytes)
pub const KEY_SIZE: usize = 32;

/// KEM shared secret size (256 bits / 32 bytes)
pub const SHARED_SECRET_SIZE: usize = 32;

/// Default HKDF context for session keys
pub const SESSION_KEY_CONTEXT: &str = "pq_transport_session";

/// Plaintext sealed by clients to prove possession of the session key
pub const KEY_CONFIRMATION_LABEL: &[u8] = b"pq-transport key confirmation";
