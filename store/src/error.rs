use thiserror::Error;

/// Failures surfaced by a [`KvStore`](crate::KvStore) or by decoding its values.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The host's storage engine failed; the message is backend-specific.
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored value no longer decodes.
    #[error("stored value is corrupted: {0}")]
    Corruption(String),
}
