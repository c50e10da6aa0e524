//! Consensus-wide verification policy, governable at runtime.

use crate::error::ParamsError;
use crate::result::MAX_SCORE;
use serde::{Deserialize, Serialize};

/// Policy read at verification time to decide result equivalence and agreement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Maximum absolute score difference for two results to be equivalent.
    #[serde(default)]
    pub score_tolerance: u32,

    /// Model versions must be identical.
    #[serde(default = "default_true")]
    pub require_model_match: bool,

    /// Input hashes must be byte-identical.
    #[serde(default = "default_true")]
    pub require_input_hash_match: bool,

    /// Fraction of total voting weight that must agree, in (0, 1].
    #[serde(default = "default_min_validator_agreement")]
    pub min_validator_agreement: f64,

    /// Soft deadline for local scoring before a request is dropped from the extension.
    #[serde(default = "default_max_verification_time_ms")]
    pub max_verification_time_ms: i64,

    /// When set, only extensions produced by this model version take part in aggregation.
    #[serde(default)]
    pub required_model_version: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_min_validator_agreement() -> f64 {
    0.67
}

fn default_max_verification_time_ms() -> i64 {
    1000
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            score_tolerance: 0,
            require_model_match: true,
            require_input_hash_match: true,
            min_validator_agreement: default_min_validator_agreement(),
            max_verification_time_ms: default_max_verification_time_ms(),
            required_model_version: None,
        }
    }
}

impl ConsensusParams {
    /// Reject values that would make agreement impossible or meaningless.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let agreement = self.min_validator_agreement;
        if !(agreement > 0.0 && agreement <= 1.0) {
            return Err(ParamsError::AgreementOutOfRange(agreement));
        }
        if self.max_verification_time_ms <= 0 {
            return Err(ParamsError::NonPositiveDeadline(self.max_verification_time_ms));
        }
        if self.score_tolerance > MAX_SCORE {
            return Err(ParamsError::ToleranceTooLarge(self.score_tolerance));
        }
        if matches!(&self.required_model_version, Some(v) if v.is_empty()) {
            return Err(ParamsError::EmptyModelVersion);
        }
        Ok(())
    }
}
