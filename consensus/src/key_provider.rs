//! Key provider port — the validator's signing key custody.

use attest_types::PrivateKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyProviderError {
    #[error("signing key unavailable: {0}")]
    Unavailable(String),

    #[error("malformed signing key: {0}")]
    Malformed(String),

    #[error("key fingerprint {reported} does not match the key ({derived})")]
    FingerprintMismatch { reported: String, derived: String },

    #[error("key provider is closed")]
    Closed,
}

/// Supplies the key used to seal this validator's vote extensions.
pub trait KeyProvider: Send + Sync {
    /// The Ed25519 seed. Zeroized when the returned value is dropped.
    fn private_key(&self) -> Result<PrivateKey, KeyProviderError>;

    /// Stable fingerprint of the public half, as produced by `attest_crypto::key_fingerprint`.
    fn key_fingerprint(&self) -> String;

    fn close(&self) -> Result<(), KeyProviderError>;
}
