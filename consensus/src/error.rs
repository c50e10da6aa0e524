use crate::handler::HeightPhase;
use crate::key_provider::KeyProviderError;
use crate::scorer::ScorerError;
use attest_store::StoreError;
use attest_types::{ParamsError, ValidatorAddress};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("scoring model is unhealthy")]
    ModelUnhealthy,

    #[error("model version mismatch: expected {expected}, got {actual}")]
    ModelVersionMismatch { expected: String, actual: String },

    #[error("invalid vote extension: {0}")]
    InvalidExtension(String),

    #[error("signature check failed for extension from {0}")]
    SignatureInvalid(ValidatorAddress),

    #[error("validator {0} is not in the active set")]
    UnknownValidator(ValidatorAddress),

    #[error("height mismatch: expected {expected}, got {actual}")]
    HeightMismatch { expected: i64, actual: i64 },

    #[error("operation requires phase {expected}, current phase is {actual}")]
    InvalidPhase {
        expected: HeightPhase,
        actual: HeightPhase,
    },

    #[error("no height is in progress")]
    NoActiveHeight,

    #[error("scorer error: {0}")]
    Scorer(#[from] ScorerError),

    #[error("key provider error: {0}")]
    KeyProvider(#[from] KeyProviderError),

    #[error("invalid consensus params: {0}")]
    Params(#[from] ParamsError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
