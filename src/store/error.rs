use thiserror::Error;

/// Errors returned by the document store and its client.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("Document already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },
    #[error("Transaction conflict on {collection}/{id}")]
    Conflict { collection: String, id: String },
    #[error("Transaction gave up after {attempts} conflicting attempts")]
    ContentionExhausted { attempts: u32 },
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn already_exists(collection: &str, id: &str) -> Self {
        StoreError::AlreadyExists {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
