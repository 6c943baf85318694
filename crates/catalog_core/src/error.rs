use thiserror::Error;

/// Failures at the document-store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connectivity or I/O failure. Fatal for the current run.
    #[error("document store unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),

    #[error("permission denied for {collection}/{id}")]
    PermissionDenied { collection: String, id: String },

    /// A stored document could not be encoded or decoded.
    #[error("corrupt document {collection}/{id}: {source}")]
    Corrupt {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One document write or delete that failed while the rest of the batch went on.
#[derive(Debug)]
pub struct MutationFailure {
    pub id: String,
    pub error: StoreError,
}
