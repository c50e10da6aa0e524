//! Errors raised while validating consensus parameters.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("min_validator_agreement must be in (0, 1], got {0}")]
    AgreementOutOfRange(f64),

    #[error("max_verification_time_ms must be positive, got {0}")]
    NonPositiveDeadline(i64),

    #[error("score_tolerance {0} exceeds the score scale of {max}", max = crate::result::MAX_SCORE)]
    ToleranceTooLarge(u32),

    #[error("required_model_version must not be empty when set")]
    EmptyModelVersion,
}
