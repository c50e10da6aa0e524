//! Vote extension payload and its wire codec.
//!
//! Wire layout: `b"AVX"`, one version byte, then a bincode body (fixed-width
//! big-endian integers, trailing bytes rejected). The whole frame is capped at
//! [`MAX_EXTENSION_SIZE`] because vote extensions ride inside consensus votes.

use crate::error::ConsensusError;
use crate::result_hash::compute_result_hash;
use attest_types::address::MAX_IDENTIFIER_LEN;
use attest_types::result::MAX_SCORE;
use attest_types::{
    RequestId, ResultHash, Timestamp, ValidatorAddress, VerificationResult, VerificationStatus,
};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Current wire-format version.
pub const VOTE_EXTENSION_VERSION: u8 = 1;

/// Frame magic preceding the version byte.
pub const WIRE_MAGIC: &[u8; 3] = b"AVX";

/// Input hashes longer than this are cut to their first bytes inside an extension.
pub const TRUNCATED_INPUT_HASH_LEN: usize = 8;

/// Upper bound on one marshaled extension, header included.
pub const MAX_EXTENSION_SIZE: usize = 64 * 1024;

/// Upper bound on results one validator may batch per height.
pub const MAX_RESULTS_PER_EXTENSION: usize = 256;

pub const MAX_MODEL_VERSION_LEN: usize = 64;

const HEADER_LEN: usize = WIRE_MAGIC.len() + 1;

/// Compact per-request entry inside a [`VoteExtension`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteExtensionResult {
    pub request_id: RequestId,
    pub score: u32,
    pub status: VerificationStatus,
    /// At most [`TRUNCATED_INPUT_HASH_LEN`] bytes.
    pub input_hash: Vec<u8>,
    /// Full hash of the untruncated source result.
    pub result_hash: ResultHash,
}

/// One validator's results for one height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteExtension {
    pub version: u8,
    pub height: i64,
    pub validator_address: ValidatorAddress,
    /// Model version active when the results were computed.
    pub model_version: String,
    /// [`Timestamp::EPOCH`] unless built with [`VoteExtension::with_timestamp`].
    pub timestamp: Timestamp,
    pub verification_results: Vec<VoteExtensionResult>,
}

/// Keep hashes of up to 8 bytes as-is, otherwise their first 8 bytes.
pub fn truncate_input_hash(hash: &[u8]) -> Vec<u8> {
    hash[..hash.len().min(TRUNCATED_INPUT_HASH_LEN)].to_vec()
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .with_limit(MAX_EXTENSION_SIZE as u64)
        .reject_trailing_bytes()
}

impl VoteExtension {
    /// Start an empty extension carrying the deterministic epoch timestamp.
    pub fn new(height: i64, validator_address: ValidatorAddress, model_version: impl Into<String>) -> Self {
        Self::with_timestamp(height, validator_address, model_version, Timestamp::EPOCH)
    }

    /// Start an empty extension with a caller-supplied timestamp.
    ///
    /// Not for the consensus path: two validators (or two runs of one) would
    /// produce different bytes for the same results.
    pub fn with_timestamp(
        height: i64,
        validator_address: ValidatorAddress,
        model_version: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            version: VOTE_EXTENSION_VERSION,
            height,
            validator_address,
            model_version: model_version.into(),
            timestamp,
            verification_results: Vec::new(),
        }
    }

    /// Append the compact form of `result`, preserving insertion order.
    pub fn add_result(&mut self, result: &VerificationResult) {
        self.verification_results.push(VoteExtensionResult {
            request_id: result.request_id.clone(),
            score: result.score,
            status: result.status,
            input_hash: truncate_input_hash(&result.input_hash),
            result_hash: compute_result_hash(result),
        });
    }

    pub fn find_result(&self, request_id: &RequestId) -> Option<&VoteExtensionResult> {
        self.verification_results
            .iter()
            .find(|r| &r.request_id == request_id)
    }

    /// Rebuild a comparable [`VerificationResult`] from one of this extension's entries.
    ///
    /// The input hash stays truncated; compare it only against other
    /// extension-sourced (or truncated) results.
    pub fn comparable_result(
        &self,
        entry: &VoteExtensionResult,
        account_address: &str,
    ) -> VerificationResult {
        VerificationResult {
            request_id: entry.request_id.clone(),
            account_address: account_address.to_string(),
            score: entry.score,
            status: entry.status,
            model_version: self.model_version.clone(),
            input_hash: entry.input_hash.clone(),
            block_height: self.height,
        }
    }

    /// Check field-length and content discipline.
    pub fn validate(&self) -> Result<(), ConsensusError> {
        if self.version != VOTE_EXTENSION_VERSION {
            return Err(invalid(format!("unsupported version {}", self.version)));
        }
        if self.height < 0 {
            return Err(invalid(format!("negative height {}", self.height)));
        }
        if !self.validator_address.is_valid() {
            return Err(invalid(format!(
                "validator address must be 1..={MAX_IDENTIFIER_LEN} bytes"
            )));
        }
        if self.model_version.len() > MAX_MODEL_VERSION_LEN {
            return Err(invalid(format!(
                "model version exceeds {MAX_MODEL_VERSION_LEN} bytes"
            )));
        }
        if self.verification_results.len() > MAX_RESULTS_PER_EXTENSION {
            return Err(invalid(format!(
                "{} results exceed the limit of {MAX_RESULTS_PER_EXTENSION}",
                self.verification_results.len()
            )));
        }

        let mut seen = BTreeSet::new();
        for entry in &self.verification_results {
            if !entry.request_id.is_valid() {
                return Err(invalid(format!(
                    "request id must be 1..={MAX_IDENTIFIER_LEN} bytes"
                )));
            }
            if entry.score > MAX_SCORE {
                return Err(invalid(format!(
                    "score {} for {} is above {MAX_SCORE}",
                    entry.score, entry.request_id
                )));
            }
            if entry.input_hash.len() > TRUNCATED_INPUT_HASH_LEN {
                return Err(invalid(format!(
                    "input hash for {} is not truncated",
                    entry.request_id
                )));
            }
            if !seen.insert(&entry.request_id) {
                return Err(invalid(format!("duplicate request {}", entry.request_id)));
            }
        }
        Ok(())
    }

    /// Encode to the wire format. Deterministic for equal content.
    pub fn marshal(&self) -> Result<Vec<u8>, ConsensusError> {
        self.validate()?;
        let body = wire_options()
            .serialize(self)
            .map_err(|e| invalid(format!("encode: {e}")))?;
        if HEADER_LEN + body.len() > MAX_EXTENSION_SIZE {
            return Err(invalid(format!(
                "encoded size {} exceeds {MAX_EXTENSION_SIZE} bytes",
                HEADER_LEN + body.len()
            )));
        }

        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(WIRE_MAGIC);
        out.push(self.version);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode wire bytes. Empty, foreign, truncated, oversized or
    /// undisciplined input is rejected as a whole.
    pub fn unmarshal(bytes: &[u8]) -> Result<Self, ConsensusError> {
        if bytes.is_empty() {
            return Err(invalid("empty input".to_string()));
        }
        if bytes.len() > MAX_EXTENSION_SIZE {
            return Err(invalid(format!(
                "{} bytes exceed {MAX_EXTENSION_SIZE}",
                bytes.len()
            )));
        }
        if bytes.len() < HEADER_LEN || &bytes[..WIRE_MAGIC.len()] != WIRE_MAGIC {
            return Err(invalid("missing vote extension header".to_string()));
        }
        let header_version = bytes[WIRE_MAGIC.len()];
        if header_version != VOTE_EXTENSION_VERSION {
            return Err(invalid(format!("unsupported version {header_version}")));
        }

        let ext: VoteExtension = wire_options()
            .deserialize(&bytes[HEADER_LEN..])
            .map_err(|e| invalid(format!("decode: {e}")))?;
        if ext.version != header_version {
            return Err(invalid(format!(
                "header version {header_version} disagrees with body version {}",
                ext.version
            )));
        }
        ext.validate()?;
        Ok(ext)
    }
}

fn invalid(reason: String) -> ConsensusError {
    ConsensusError::InvalidExtension(reason)
}
