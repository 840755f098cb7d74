//! In-memory stand-in for the persistence collaborator
//!
//! Receives plaintext only after the payload adapter accepted it.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use shared_protocol::{DocumentResponse, Identity, MessageResponse};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct RecordStore {
    messages: RwLock<Vec<MessageResponse>>,
    documents: RwLock<Vec<DocumentResponse>>,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_message(
        &self,
        sender_id: Identity,
        recipient_id: Identity,
        content: String,
    ) -> MessageResponse {
        let record = MessageResponse {
            id: Uuid::new_v4(),
            sender_id,
            recipient_id,
            content,
            timestamp: now_millis(),
        };
        self.messages.write().push(record.clone());
        record
    }

    /// Messages exchanged between two identities, oldest first, at most `limit`
    pub fn conversation(&self, a: &Identity, b: &Identity, limit: usize) -> Vec<MessageResponse> {
        let messages = self.messages.read();
        let matching: Vec<_> = messages
            .iter()
            .filter(|m| {
                (&m.sender_id == a && &m.recipient_id == b)
                    || (&m.sender_id == b && &m.recipient_id == a)
            })
            .collect();
        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).cloned().collect()
    }

    pub fn insert_document(&self, owner_id: Identity, title: String, content: String) -> DocumentResponse {
        let record = DocumentResponse {
            id: Uuid::new_v4(),
            owner_id,
            title,
            content,
            timestamp: now_millis(),
        };
        self.documents.write().push(record.clone());
        record
    }

    pub fn documents_for(&self, owner: &Identity) -> Vec<DocumentResponse> {
        self.documents
            .read()
            .iter()
            .filter(|d| &d.owner_id == owner)
            .cloned()
            .collect()
    }

    pub fn message_count(&self) -> usize {
        self.messages.read().len()
    }

    pub fn document_count(&self) -> usize {
        self.documents.read().len()
    }
}
