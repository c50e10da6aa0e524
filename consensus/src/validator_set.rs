//! The active validator set and how agreement weight is counted.

use attest_crypto::key_fingerprint;
use attest_types::{PublicKey, ValidatorAddress};
use std::collections::BTreeMap;

/// A validator eligible to contribute extensions at the current height.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorInfo {
    pub address: ValidatorAddress,
    pub public_key: PublicKey,
    pub voting_power: u64,
}

impl ValidatorInfo {
    pub fn new(address: ValidatorAddress, public_key: PublicKey, voting_power: u64) -> Self {
        Self {
            address,
            public_key,
            voting_power,
        }
    }

    /// Fingerprint the validator's key provider is expected to report.
    pub fn key_fingerprint(&self) -> String {
        key_fingerprint(&self.public_key)
    }
}

/// How much one validator's agreement counts toward the threshold.
pub trait AgreementWeighting: Send + Sync {
    fn weight(&self, validator: &ValidatorInfo) -> u64;
}

/// Weight by voting power (stake).
#[derive(Clone, Copy, Debug, Default)]
pub struct StakeWeighted;

impl AgreementWeighting for StakeWeighted {
    fn weight(&self, validator: &ValidatorInfo) -> u64 {
        validator.voting_power
    }
}

/// One validator, one vote.
#[derive(Clone, Copy, Debug, Default)]
pub struct EqualWeight;

impl AgreementWeighting for EqualWeight {
    fn weight(&self, _validator: &ValidatorInfo) -> u64 {
        1
    }
}

/// Active validators keyed by address, iterated in address order.
#[derive(Clone, Debug, Default)]
pub struct ValidatorSet {
    validators: BTreeMap<ValidatorAddress, ValidatorInfo>,
}

impl ValidatorSet {
    /// Build a set; a later entry for the same address replaces an earlier one.
    pub fn new(validators: impl IntoIterator<Item = ValidatorInfo>) -> Self {
        Self {
            validators: validators
                .into_iter()
                .map(|v| (v.address.clone(), v))
                .collect(),
        }
    }

    pub fn get(&self, address: &ValidatorAddress) -> Option<&ValidatorInfo> {
        self.validators.get(address)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Validators in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = &ValidatorInfo> {
        self.validators.values()
    }

    /// Weight of one validator, or 0 if it is not in the set.
    pub fn weight_of(&self, address: &ValidatorAddress, weighting: &dyn AgreementWeighting) -> u128 {
        self.get(address)
            .map_or(0, |v| u128::from(weighting.weight(v)))
    }

    /// Total weight of the whole active set.
    pub fn total_weight(&self, weighting: &dyn AgreementWeighting) -> u128 {
        self.iter().map(|v| u128::from(weighting.weight(v))).sum()
    }
}
