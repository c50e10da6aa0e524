//! Scorer port — the ML inference engine seen from the consensus core.
//!
//! Only the output contract matters here; the algorithm behind it is opaque.

use attest_types::RequestId;
use thiserror::Error;

/// One evidentiary feature fed to the model.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub name: String,
    pub value: f64,
}

/// A pending verification request handed to the scorer.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreInput {
    pub request_id: RequestId,
    pub account_address: String,
    pub features: Vec<Feature>,
}

/// What the model produced for one input.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreOutput {
    /// Score on the 0–100 scale.
    pub score: u32,
    pub model_version: String,
    /// Model confidence in [0, 1].
    pub confidence: f64,
    /// Fingerprint of the feature input. Empty for symbolic evidence.
    pub input_hash: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("invalid input for request {request_id}: {reason}")]
    InvalidInput { request_id: RequestId, reason: String },

    #[error("scorer is closed")]
    Closed,
}

/// The inference engine.
///
/// Implementations must be callable from several threads; the core never
/// holds a lock around them.
pub trait Scorer: Send + Sync {
    fn score(&self, input: &ScoreInput) -> Result<ScoreOutput, ScorerError>;

    /// Version of the model currently loaded.
    fn model_version(&self) -> String;

    /// Whether the engine can currently produce trustworthy results.
    fn is_healthy(&self) -> bool;

    fn close(&self) -> Result<(), ScorerError>;
}
