//! Per-height vote-extension state machine.
//!
//! ```text
//! Collecting ──extend_vote──▶ Sealed ──aggregate──▶ Aggregating ──▶ Decided ──commit──▶ (discarded)
//!      │                         │                                     │
//!      └────────────── abort / begin_height (discard) ─────────────────┘
//! ```
//!
//! The host consensus engine serializes calls (one height at a time), so the
//! handler owns its state without locks. Extensions arriving once aggregation
//! has started are ignored; a decided height is never revised.

use crate::aggregation::{AggregationOutcome, Aggregator, ReceivedExtension};
use crate::clock::Clock;
use crate::decisions::store_decisions;
use crate::error::ConsensusError;
use crate::result_hash::compute_result_hash;
use crate::scorer::ScoreInput;
use crate::sealed::SealedVoteExtension;
use crate::validator_set::{AgreementWeighting, ValidatorSet};
use crate::verifier::ConsensusVerifier;
use crate::vote_extension::{truncate_input_hash, VoteExtension, MAX_RESULTS_PER_EXTENSION};
use attest_store::KvStore;
use attest_types::{RequestId, ValidatorAddress, VerificationResult};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeightPhase {
    /// Local results are being computed.
    Collecting,
    /// Local extension handed to the consensus layer.
    Sealed,
    /// Comparing the captured extension snapshot.
    Aggregating,
    /// Every request has a terminal decision.
    Decided,
}

impl fmt::Display for HeightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Collecting => "collecting",
            Self::Sealed => "sealed",
            Self::Aggregating => "aggregating",
            Self::Decided => "decided",
        };
        f.write_str(s)
    }
}

struct HeightRound {
    height: i64,
    phase: HeightPhase,
    requests: Vec<ScoreInput>,
    local_results: Vec<VerificationResult>,
    received: Vec<ReceivedExtension>,
    outcome: Option<AggregationOutcome>,
}

fn round_at(round: &mut Option<HeightRound>, height: i64) -> Result<&mut HeightRound, ConsensusError> {
    match round.as_ref().map(|r| r.height) {
        Some(active) if active != height => {
            return Err(ConsensusError::HeightMismatch {
                expected: active,
                actual: height,
            })
        }
        _ => {}
    }
    round.as_mut().ok_or(ConsensusError::NoActiveHeight)
}

pub struct VoteExtensionHandler {
    verifier: ConsensusVerifier,
    address: ValidatorAddress,
    validators: ValidatorSet,
    weighting: Box<dyn AgreementWeighting>,
    clock: Arc<dyn Clock>,
    store: Option<Arc<dyn KvStore + Send + Sync>>,
    round: Option<HeightRound>,
}

impl VoteExtensionHandler {
    pub fn new(
        verifier: ConsensusVerifier,
        address: ValidatorAddress,
        validators: ValidatorSet,
        weighting: Box<dyn AgreementWeighting>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            verifier,
            address,
            validators,
            weighting,
            clock,
            store: None,
            round: None,
        }
    }

    /// Persist decisions through `store` on [`commit`](Self::commit).
    pub fn with_store(mut self, store: Arc<dyn KvStore + Send + Sync>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn address(&self) -> &ValidatorAddress {
        &self.address
    }

    pub fn verifier(&self) -> &ConsensusVerifier {
        &self.verifier
    }

    /// Mutable access, e.g. to apply governance-updated params between heights.
    pub fn verifier_mut(&mut self) -> &mut ConsensusVerifier {
        &mut self.verifier
    }

    pub fn validators(&self) -> &ValidatorSet {
        &self.validators
    }

    /// Replace the active set. Used by the next authentication or aggregation.
    pub fn set_validators(&mut self, validators: ValidatorSet) {
        self.validators = validators;
    }

    pub fn height(&self) -> Option<i64> {
        self.round.as_ref().map(|r| r.height)
    }

    pub fn phase(&self) -> Option<HeightPhase> {
        self.round.as_ref().map(|r| r.phase)
    }

    /// Results this validator computed for the current height.
    pub fn local_results(&self) -> &[VerificationResult] {
        self.round
            .as_ref()
            .map_or(&[][..], |r| r.local_results.as_slice())
    }

    /// Start `height` in [`HeightPhase::Collecting`], discarding any earlier round.
    pub fn begin_height(&mut self, height: i64, requests: Vec<ScoreInput>) {
        if let Some(old) = &self.round {
            debug!(height = old.height, phase = %old.phase, "discarding uncommitted height");
        }
        info!(height, requests = requests.len(), "collecting verification results");
        self.round = Some(HeightRound {
            height,
            phase: HeightPhase::Collecting,
            requests,
            local_results: Vec::new(),
            received: Vec::new(),
            outcome: None,
        });
    }

    /// Score pending requests, then build, seal and encode this validator's extension.
    ///
    /// Requests not scored by the deadline are left out. An unhealthy or stale
    /// model yields an empty (still signed) extension.
    pub fn extend_vote(&mut self, height: i64) -> Result<Vec<u8>, ConsensusError> {
        let round = round_at(&mut self.round, height)?;
        if round.phase != HeightPhase::Collecting {
            return Err(ConsensusError::InvalidPhase {
                expected: HeightPhase::Collecting,
                actual: round.phase,
            });
        }

        let computation = self
            .verifier
            .compute_results(&round.requests, height, self.clock.as_ref());
        let mut extension = VoteExtension::new(
            height,
            self.address.clone(),
            self.verifier.scorer().model_version(),
        );
        let mut results = computation.results;
        if results.len() > MAX_RESULTS_PER_EXTENSION {
            warn!(
                height,
                dropped = results.len() - MAX_RESULTS_PER_EXTENSION,
                "too many results for one extension"
            );
            results.truncate(MAX_RESULTS_PER_EXTENSION);
        }
        for result in &results {
            extension.add_result(result);
        }

        let sealed = SealedVoteExtension::seal(&extension, self.verifier.key_provider())?;
        let bytes = sealed.to_bytes()?;

        info!(
            height,
            results = results.len(),
            omitted = computation.omitted.len(),
            abstained = computation.abstained,
            bytes = bytes.len(),
            "sealed vote extension"
        );
        round.local_results = results;
        round.received.push(ReceivedExtension {
            sender: self.address.clone(),
            bytes: bytes.clone(),
        });
        round.phase = HeightPhase::Sealed;
        Ok(bytes)
    }

    /// Authenticate a peer's extension for the host's verify hook.
    ///
    /// Entries that diverge from this validator's own results are logged;
    /// divergence alone never rejects an extension.
    pub fn verify_vote_extension(
        &self,
        height: i64,
        sender: &ValidatorAddress,
        bytes: &[u8],
    ) -> Result<VoteExtension, ConsensusError> {
        let aggregator = Aggregator::new(
            self.verifier.params(),
            &self.validators,
            self.weighting.as_ref(),
        );
        let received = ReceivedExtension {
            sender: sender.clone(),
            bytes: bytes.to_vec(),
        };
        let extension = aggregator.open(height, &received)?;

        for entry in &extension.verification_results {
            let Some(local) = self
                .local_results()
                .iter()
                .find(|r| r.request_id == entry.request_id)
            else {
                continue;
            };
            if compute_result_hash(local) == entry.result_hash {
                continue;
            }
            let mut mine = local.clone();
            mine.input_hash = truncate_input_hash(&local.input_hash);
            let theirs = extension.comparable_result(entry, &local.account_address);
            let cmp = self.verifier.compare_results(&theirs, &mine);
            if !cmp.matches {
                debug!(
                    height,
                    validator = %sender,
                    request_id = %entry.request_id,
                    differences = ?cmp.differences,
                    "peer result diverges from local result"
                );
            }
        }
        Ok(extension)
    }

    /// Add a peer's raw extension to the snapshot for `height`.
    ///
    /// Returns `false` when it arrived after aggregation started and was ignored.
    pub fn receive_vote_extension(
        &mut self,
        height: i64,
        sender: ValidatorAddress,
        bytes: Vec<u8>,
    ) -> Result<bool, ConsensusError> {
        let round = round_at(&mut self.round, height)?;
        match round.phase {
            HeightPhase::Collecting | HeightPhase::Sealed => {
                round.received.push(ReceivedExtension { sender, bytes });
                Ok(true)
            }
            HeightPhase::Aggregating | HeightPhase::Decided => {
                debug!(height, validator = %sender, "ignoring late vote extension");
                Ok(false)
            }
        }
    }

    /// Decide every request scheduled for `height` from the captured snapshot.
    ///
    /// Calling it again for a decided height returns the same outcome.
    pub fn aggregate(&mut self, height: i64) -> Result<&AggregationOutcome, ConsensusError> {
        let round = round_at(&mut self.round, height)?;
        if round.outcome.is_none() {
            round.phase = HeightPhase::Aggregating;
            let accounts: BTreeMap<RequestId, String> = round
                .requests
                .iter()
                .map(|r| (r.request_id.clone(), r.account_address.clone()))
                .collect();
            let aggregator = Aggregator::new(
                self.verifier.params(),
                &self.validators,
                self.weighting.as_ref(),
            );
            round.outcome = Some(aggregator.aggregate(height, &round.received, &accounts));
            round.phase = HeightPhase::Decided;
        }
        round
            .outcome
            .as_ref()
            .ok_or(ConsensusError::NoActiveHeight)
    }

    /// Persist the decided outcome (if a store is attached) and finish the height.
    pub fn commit(&mut self, height: i64) -> Result<AggregationOutcome, ConsensusError> {
        let round = round_at(&mut self.round, height)?;
        let Some(outcome) = round.outcome.as_ref() else {
            return Err(ConsensusError::InvalidPhase {
                expected: HeightPhase::Decided,
                actual: round.phase,
            });
        };
        if let Some(store) = &self.store {
            store_decisions(store.as_ref(), outcome)?;
        }

        let outcome = self
            .round
            .take()
            .and_then(|r| r.outcome)
            .ok_or(ConsensusError::NoActiveHeight)?;
        info!(height, decisions = outcome.decisions.len(), "committed verification decisions");
        Ok(outcome)
    }

    /// Drop all state for `height`; nothing is persisted.
    pub fn abort(&mut self, height: i64) {
        if self.height() == Some(height) {
            warn!(height, phase = ?self.phase(), "aborting height");
            self.round = None;
        }
    }
}
