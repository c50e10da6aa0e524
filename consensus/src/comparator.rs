//! Tolerance-based equivalence of two independently computed results.
//!
//! Pure and allocation-light: aggregation calls this O(validators²) times per
//! request per height.

use attest_types::{ConsensusParams, VerificationResult};

/// Outcome of comparing a proposed result against a locally computed one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComparisonResult {
    /// All sub-checks passed.
    pub matches: bool,
    /// One entry per failed sub-check, in check order. Empty iff `matches`.
    pub differences: Vec<String>,
    /// `proposed.score - computed.score`.
    pub score_difference: i32,
    pub proposed_score: u32,
    pub computed_score: u32,
    pub model_version_match: bool,
    pub input_hash_match: bool,
    pub status_match: bool,
}

/// Compare `proposed` with `computed` under `params`.
pub fn compare_results(
    proposed: &VerificationResult,
    computed: &VerificationResult,
    params: &ConsensusParams,
) -> ComparisonResult {
    let mut differences = Vec::new();

    let diff = i64::from(proposed.score) - i64::from(computed.score);
    let score_within = diff.unsigned_abs() <= u64::from(params.score_tolerance);
    if !score_within {
        differences.push(format!(
            "score difference {diff} exceeds tolerance {} (proposed {}, computed {})",
            params.score_tolerance, proposed.score, computed.score
        ));
    }

    let model_version_match =
        !params.require_model_match || proposed.model_version == computed.model_version;
    if !model_version_match {
        differences.push(format!(
            "model version mismatch: proposed {}, computed {}",
            proposed.model_version, computed.model_version
        ));
    }

    let input_hash_match =
        !params.require_input_hash_match || proposed.input_hash == computed.input_hash;
    if !input_hash_match {
        differences.push(format!(
            "input hash mismatch: proposed {}, computed {}",
            hex::encode(&proposed.input_hash),
            hex::encode(&computed.input_hash)
        ));
    }

    let status_match = proposed.status == computed.status;
    if !status_match {
        differences.push(format!(
            "status mismatch: proposed {}, computed {}",
            proposed.status, computed.status
        ));
    }

    ComparisonResult {
        matches: differences.is_empty(),
        differences,
        score_difference: diff.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
        proposed_score: proposed.score,
        computed_score: computed.score,
        model_version_match,
        input_hash_match,
        status_match,
    }
}
