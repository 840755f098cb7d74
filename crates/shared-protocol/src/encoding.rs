//! Transport encoding for binary fields

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::{ProtocolError, ProtocolResult};

/// Encode bytes for a JSON string field
pub fn encode_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 JSON string field, naming the field on failure
pub fn decode_bytes(field: &'static str, encoded: &str) -> ProtocolResult<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|_| ProtocolError::InvalidEncoding { field })
}
