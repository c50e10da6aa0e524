//! Turning the validator set's vote extensions into one decision per request.
//!
//! Aggregation is a pure function of the captured extension set: inputs are
//! sorted by validator address before any comparison, so re-running it on the
//! same snapshot always yields the same decisions.

use crate::comparator::compare_results;
use crate::error::ConsensusError;
use crate::sealed::SealedVoteExtension;
use crate::validator_set::{AgreementWeighting, ValidatorSet};
use crate::vote_extension::VoteExtension;
use attest_types::{ConsensusParams, RequestId, ValidatorAddress, VerificationResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Raw extension bytes as delivered by the host consensus engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedExtension {
    /// Validator the consensus engine attributes the vote to.
    pub sender: ValidatorAddress,
    pub bytes: Vec<u8>,
}

/// An accepted result backed by enough voting weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agreement {
    /// The reference result the agreeing validators matched. Its input hash is
    /// the truncated, extension-sourced one.
    pub result: VerificationResult,
    /// Ascending by address.
    pub agreeing_validators: Vec<ValidatorAddress>,
    pub agreement_fraction: f64,
}

/// Not enough weight backed any single result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoAgreement {
    pub request_id: RequestId,
    pub best_fraction: f64,
    pub required_fraction: f64,
    /// Validators that reported a result for this request.
    pub participants: usize,
}

/// Terminal state of one request at one height.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    Agreed(Agreement),
    /// Routed to borderline review downstream.
    Undecided(NoAgreement),
}

impl Decision {
    pub fn request_id(&self) -> &RequestId {
        match self {
            Self::Agreed(a) => &a.result.request_id,
            Self::Undecided(n) => &n.request_id,
        }
    }

    pub fn is_agreed(&self) -> bool {
        matches!(self, Self::Agreed(_))
    }
}

/// An extension excluded from aggregation. Never fatal to the block.
#[derive(Debug)]
pub struct Rejection {
    pub validator: ValidatorAddress,
    pub reason: ConsensusError,
}

#[derive(Debug)]
pub struct AggregationOutcome {
    pub height: i64,
    pub decisions: BTreeMap<RequestId, Decision>,
    pub rejected: Vec<Rejection>,
    /// Validators whose extensions were accepted, ascending.
    pub contributors: Vec<ValidatorAddress>,
    /// Entries for requests this height never scheduled, ignored.
    pub unscheduled: Vec<(ValidatorAddress, RequestId)>,
}

impl AggregationOutcome {
    pub fn agreed(&self) -> impl Iterator<Item = &Agreement> {
        self.decisions.values().filter_map(|d| match d {
            Decision::Agreed(a) => Some(a),
            Decision::Undecided(_) => None,
        })
    }

    pub fn undecided(&self) -> impl Iterator<Item = &NoAgreement> {
        self.decisions.values().filter_map(|d| match d {
            Decision::Undecided(n) => Some(n),
            Decision::Agreed(_) => None,
        })
    }
}

struct Candidate {
    validator: ValidatorAddress,
    weight: u128,
    result: VerificationResult,
}

pub struct Aggregator<'a> {
    params: &'a ConsensusParams,
    validators: &'a ValidatorSet,
    weighting: &'a dyn AgreementWeighting,
}

impl<'a> Aggregator<'a> {
    pub fn new(
        params: &'a ConsensusParams,
        validators: &'a ValidatorSet,
        weighting: &'a dyn AgreementWeighting,
    ) -> Self {
        Self {
            params,
            validators,
            weighting,
        }
    }

    /// Authenticate `received` and decide every scheduled request they mention.
    ///
    /// `scheduled` maps the height's request ids to subject addresses;
    /// extensions do not carry them. Entries for any other request are
    /// ignored and reported in [`AggregationOutcome::unscheduled`].
    pub fn aggregate(
        &self,
        height: i64,
        received: &[ReceivedExtension],
        scheduled: &BTreeMap<RequestId, String>,
    ) -> AggregationOutcome {
        let (accepted, rejected) = self.authenticate(height, received);
        let decisions = self.decide(&accepted, scheduled);

        let unscheduled: Vec<(ValidatorAddress, RequestId)> = accepted
            .iter()
            .flat_map(|e| {
                e.verification_results
                    .iter()
                    .filter(|r| !scheduled.contains_key(&r.request_id))
                    .map(|r| (e.validator_address.clone(), r.request_id.clone()))
            })
            .collect();
        for (validator, request_id) in &unscheduled {
            warn!(height, %validator, %request_id, "ignoring result for unscheduled request");
        }

        let agreed = decisions.values().filter(|d| d.is_agreed()).count();
        info!(
            height,
            contributors = accepted.len(),
            rejected = rejected.len(),
            agreed,
            undecided = decisions.len() - agreed,
            "aggregated vote extensions"
        );

        AggregationOutcome {
            height,
            decisions,
            rejected,
            contributors: accepted.into_iter().map(|e| e.validator_address).collect(),
            unscheduled,
        }
    }

    /// Open one extension and apply the height and model policy.
    pub fn open(
        &self,
        height: i64,
        received: &ReceivedExtension,
    ) -> Result<VoteExtension, ConsensusError> {
        let sealed = SealedVoteExtension::from_bytes(&received.bytes)?;
        let extension = sealed.open(self.validators, &received.sender)?;
        if extension.height != height {
            return Err(ConsensusError::HeightMismatch {
                expected: height,
                actual: extension.height,
            });
        }
        if let Some(required) = &self.params.required_model_version {
            if &extension.model_version != required {
                return Err(ConsensusError::ModelVersionMismatch {
                    expected: required.clone(),
                    actual: extension.model_version,
                });
            }
        }
        Ok(extension)
    }

    /// Keep at most one authenticated extension per validator, in address order.
    ///
    /// A validator that sent two different extensions for the height is
    /// excluded entirely; an exact resend is harmless.
    pub fn authenticate(
        &self,
        height: i64,
        received: &[ReceivedExtension],
    ) -> (Vec<VoteExtension>, Vec<Rejection>) {
        let mut ordered: Vec<&ReceivedExtension> = received.iter().collect();
        ordered.sort_by(|a, b| a.sender.cmp(&b.sender).then_with(|| a.bytes.cmp(&b.bytes)));
        ordered.dedup_by(|a, b| a.sender == b.sender && a.bytes == b.bytes);

        let mut rejected = Vec::new();
        let mut per_validator: BTreeMap<ValidatorAddress, Vec<VoteExtension>> = BTreeMap::new();
        for item in ordered {
            match self.open(height, item) {
                Ok(extension) => per_validator
                    .entry(item.sender.clone())
                    .or_default()
                    .push(extension),
                Err(reason) => {
                    warn!(height, validator = %item.sender, %reason, "dropping vote extension");
                    rejected.push(Rejection {
                        validator: item.sender.clone(),
                        reason,
                    });
                }
            }
        }

        let mut accepted = Vec::with_capacity(per_validator.len());
        for (validator, mut extensions) in per_validator {
            extensions.dedup();
            if extensions.len() > 1 {
                warn!(height, %validator, count = extensions.len(), "conflicting vote extensions");
                rejected.push(Rejection {
                    validator,
                    reason: ConsensusError::InvalidExtension(
                        "conflicting extensions for one height".to_string(),
                    ),
                });
                continue;
            }
            accepted.extend(extensions);
        }
        (accepted, rejected)
    }

    /// Decide every request in `scheduled` that `extensions` mention.
    pub fn decide(
        &self,
        extensions: &[VoteExtension],
        scheduled: &BTreeMap<RequestId, String>,
    ) -> BTreeMap<RequestId, Decision> {
        let mut ordered: Vec<&VoteExtension> = extensions.iter().collect();
        ordered.sort_by(|a, b| a.validator_address.cmp(&b.validator_address));

        let mut by_request: BTreeMap<RequestId, Vec<Candidate>> = BTreeMap::new();
        for extension in ordered {
            let weight = self
                .validators
                .weight_of(&extension.validator_address, self.weighting);
            for entry in &extension.verification_results {
                let Some(account) = scheduled.get(&entry.request_id) else {
                    continue;
                };
                by_request
                    .entry(entry.request_id.clone())
                    .or_default()
                    .push(Candidate {
                        validator: extension.validator_address.clone(),
                        weight,
                        result: extension.comparable_result(entry, account),
                    });
            }
        }

        let total = self.validators.total_weight(self.weighting);
        by_request
            .into_iter()
            .map(|(request_id, candidates)| {
                let decision = self.decide_request(&request_id, &candidates, total);
                (request_id, decision)
            })
            .collect()
    }

    /// Pick the reference result backed by the most weight; ties go to the
    /// lowest validator address.
    fn decide_request(
        &self,
        request_id: &RequestId,
        candidates: &[Candidate],
        total_weight: u128,
    ) -> Decision {
        let mut best: Option<(usize, u128, Vec<usize>)> = None;
        for (i, reference) in candidates.iter().enumerate() {
            let agreeing: Vec<usize> = candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| compare_results(&c.result, &reference.result, self.params).matches)
                .map(|(j, _)| j)
                .collect();
            let weight: u128 = agreeing.iter().map(|&j| candidates[j].weight).sum();
            if best.as_ref().map_or(true, |(_, w, _)| weight > *w) {
                best = Some((i, weight, agreeing));
            }
        }

        let (reference, best_weight, agreeing) = best.unwrap_or_default();
        let fraction = if total_weight == 0 {
            0.0
        } else {
            best_weight as f64 / total_weight as f64
        };

        if !agreeing.is_empty() && fraction >= self.params.min_validator_agreement {
            debug!(%request_id, fraction, "request agreed");
            return Decision::Agreed(Agreement {
                result: candidates[reference].result.clone(),
                agreeing_validators: agreeing
                    .into_iter()
                    .map(|j| candidates[j].validator.clone())
                    .collect(),
                agreement_fraction: fraction,
            });
        }

        debug!(%request_id, fraction, "request undecided");
        Decision::Undecided(NoAgreement {
            request_id: request_id.clone(),
            best_fraction: fraction,
            required_fraction: self.params.min_validator_agreement,
            participants: candidates.len(),
        })
    }
}
