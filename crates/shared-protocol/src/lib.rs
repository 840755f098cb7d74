//! Shared Protocol Definitions for the PQ transport layer
//!
//! Wire-level request and response types exchanged between clients and the
//! transport server: public-key exposure, handshake submission, and
//! message/document payload submission.

mod encoding;
mod error;
mod payload;
mod session;

pub use encoding::*;
pub use error::*;
pub use payload::*;
pub use session::*;

/// Wire protocol version reported by the server
pub const PROTOCOL_VERSION: u32 = 1;
