//! Application state

use std::sync::Arc;

use crypto_session::{
    CryptoResult, HandshakeCoordinator, KemService, PayloadAdapter, SessionKeyStore,
    TransportConfig,
};

use crate::records::RecordStore;

/// Services built once at startup and shared by every request
#[derive(Clone)]
pub struct AppState {
    pub handshake: HandshakeCoordinator,
    pub adapter: PayloadAdapter,
    pub store: Arc<SessionKeyStore>,
    pub records: Arc<RecordStore>,
}

impl AppState {
    /// Generates the process KEM keypair; failure is fatal to startup
    pub fn new(config: &TransportConfig) -> CryptoResult<Self> {
        let kem = Arc::new(KemService::generate(config.kem_algorithm)?);
        let store = Arc::new(SessionKeyStore::with_ttl(config.session_ttl));

        Ok(Self {
            handshake: HandshakeCoordinator::new(kem, Arc::clone(&store), config),
            adapter: PayloadAdapter::new(Arc::clone(&store), config),
            store,
            records: Arc::new(RecordStore::new()),
        })
    }
}
