//! The canonical outcome of one identity-verification request at one validator.

use crate::address::RequestId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of the verification score scale.
pub const MAX_SCORE: u32 = 100;

/// Outcome class of a verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationStatus {
    Success,
    Partial,
    Failed,
}

impl VerificationStatus {
    /// Stable single-byte tag used in hashes.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Partial => 1,
            Self::Failed => 2,
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A verification result computed locally by one validator.
///
/// Produced once per computation and never mutated afterwards; a new
/// computation yields a new value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub request_id: RequestId,
    /// Chain address of the verified subject.
    pub account_address: String,
    /// Score on the 0–100 scale.
    pub score: u32,
    pub status: VerificationStatus,
    /// Semantic version of the model that produced the score.
    pub model_version: String,
    /// Content hash of the feature input. Empty when the evidence was symbolic.
    pub input_hash: Vec<u8>,
    pub block_height: i64,
}

impl VerificationResult {
    /// Whether the score lies on the 0–100 scale.
    pub fn score_in_range(&self) -> bool {
        self.score <= MAX_SCORE
    }
}
