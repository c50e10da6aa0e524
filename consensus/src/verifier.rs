//! Façade binding a scorer, a key provider and the consensus params.
//!
//! Construction performs no I/O. Model health and version are checked lazily
//! at verification time because both can change between blocks.

use crate::clock::Clock;
use crate::comparator::{compare_results, ComparisonResult};
use crate::error::ConsensusError;
use crate::key_provider::KeyProvider;
use crate::scorer::{ScoreInput, ScoreOutput, Scorer, ScorerError};
use attest_types::result::MAX_SCORE;
use attest_types::{ConsensusParams, RequestId, VerificationResult, VerificationStatus};
use std::sync::Arc;
use tracing::{debug, warn};

/// Confidence at or above which a score is reported as [`VerificationStatus::Success`].
pub const SUCCESS_CONFIDENCE: f64 = 0.75;

/// Confidence at or above which a score is reported as [`VerificationStatus::Partial`].
pub const PARTIAL_CONFIDENCE: f64 = 0.40;

/// Results this validator managed to compute for one height.
#[derive(Debug, Default)]
pub struct LocalComputation {
    /// In input order.
    pub results: Vec<VerificationResult>,
    /// Requests left out of the extension, with the reason.
    pub omitted: Vec<(RequestId, String)>,
    /// The whole height was skipped (unhealthy or stale model).
    pub abstained: bool,
}

pub struct ConsensusVerifier {
    scorer: Arc<dyn Scorer>,
    keys: Arc<dyn KeyProvider>,
    params: ConsensusParams,
}

impl ConsensusVerifier {
    pub fn new(
        scorer: Arc<dyn Scorer>,
        keys: Arc<dyn KeyProvider>,
        params: ConsensusParams,
    ) -> Result<Self, ConsensusError> {
        params.validate()?;
        Ok(Self {
            scorer,
            keys,
            params,
        })
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    /// Swap in governance-updated params for subsequent heights.
    pub fn set_params(&mut self, params: ConsensusParams) -> Result<(), ConsensusError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn scorer(&self) -> &dyn Scorer {
        self.scorer.as_ref()
    }

    pub fn key_provider(&self) -> &dyn KeyProvider {
        self.keys.as_ref()
    }

    /// Compare two results under the bound params.
    pub fn compare_results(
        &self,
        proposed: &VerificationResult,
        computed: &VerificationResult,
    ) -> ComparisonResult {
        compare_results(proposed, computed, &self.params)
    }

    /// Fail unless the scorer is healthy and runs `expected_version`.
    pub fn validate_model_version(&self, expected_version: &str) -> Result<(), ConsensusError> {
        if !self.scorer.is_healthy() {
            return Err(ConsensusError::ModelUnhealthy);
        }
        let actual = self.scorer.model_version();
        if actual != expected_version {
            return Err(ConsensusError::ModelVersionMismatch {
                expected: expected_version.to_string(),
                actual,
            });
        }
        Ok(())
    }

    /// Whether this validator may vote at all: healthy model, and the
    /// governance-required version if one is set.
    pub fn check_local_model(&self) -> Result<(), ConsensusError> {
        match &self.params.required_model_version {
            Some(required) => self.validate_model_version(required),
            None if self.scorer.is_healthy() => Ok(()),
            None => Err(ConsensusError::ModelUnhealthy),
        }
    }

    /// Score one request and wrap the output as a result at `height`.
    ///
    /// The output must carry the version the scorer reports, since the
    /// extension states a single model version for all of its results.
    pub fn compute_result(
        &self,
        input: &ScoreInput,
        height: i64,
    ) -> Result<VerificationResult, ConsensusError> {
        let expected = self.scorer.model_version();
        let output = self.scorer.score(input)?;
        if output.model_version != expected {
            return Err(ConsensusError::ModelVersionMismatch {
                expected,
                actual: output.model_version,
            });
        }
        let result = build_result(input, output, height);
        if !result.score_in_range() {
            return Err(ScorerError::InvalidInput {
                request_id: input.request_id.clone(),
                reason: format!("model returned score {} above {MAX_SCORE}", result.score),
            }
            .into());
        }
        Ok(result)
    }

    /// Score `inputs` for `height` within `max_verification_time_ms`.
    ///
    /// Requests that fail, or finish after the deadline, are omitted rather
    /// than delaying the block. An unhealthy or stale model abstains.
    pub fn compute_results(
        &self,
        inputs: &[ScoreInput],
        height: i64,
        clock: &dyn Clock,
    ) -> LocalComputation {
        let mut out = LocalComputation::default();

        if let Err(e) = self.check_local_model() {
            warn!(height, reason = %e, "abstaining from verification at this height");
            out.abstained = true;
            out.omitted = inputs
                .iter()
                .map(|i| (i.request_id.clone(), e.to_string()))
                .collect();
            return out;
        }

        let budget = self.params.max_verification_time_ms.max(0) as u64;
        let deadline = clock.now_millis().saturating_add(budget);

        for input in inputs {
            if clock.now_millis() >= deadline {
                out.omitted
                    .push((input.request_id.clone(), "deadline reached".to_string()));
                continue;
            }
            match self.compute_result(input, height) {
                Ok(_) if clock.now_millis() > deadline => {
                    debug!(height, request_id = %input.request_id, "result arrived after deadline");
                    out.omitted
                        .push((input.request_id.clone(), "finished after deadline".to_string()));
                }
                Ok(result) => out.results.push(result),
                Err(e) => {
                    warn!(height, request_id = %input.request_id, error = %e, "scoring failed");
                    out.omitted.push((input.request_id.clone(), e.to_string()));
                }
            }
        }
        out
    }

    /// Release the scorer and key provider.
    pub fn close(&self) -> Result<(), ConsensusError> {
        self.scorer.close()?;
        self.keys.close()?;
        Ok(())
    }
}

fn status_for(confidence: f64) -> VerificationStatus {
    if confidence >= SUCCESS_CONFIDENCE {
        VerificationStatus::Success
    } else if confidence >= PARTIAL_CONFIDENCE {
        VerificationStatus::Partial
    } else {
        VerificationStatus::Failed
    }
}

fn build_result(input: &ScoreInput, output: ScoreOutput, height: i64) -> VerificationResult {
    VerificationResult {
        request_id: input.request_id.clone(),
        account_address: input.account_address.clone(),
        score: output.score,
        status: status_for(output.confidence),
        model_version: output.model_version,
        input_hash: output.input_hash,
        block_height: height,
    }
}
