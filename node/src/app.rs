//! Binding of the consensus core to the host chain's vote-extension hooks.
//!
//! The host engine drives one height at a time:
//!
//! ```text
//! prepare_vote_extension ─▶ verify/receive peers' extensions ─▶ finalize_block
//!                                                            └▶ abort_block
//! ```
//!
//! `finalize_block` routes agreed results to the [`AgreedSink`] and
//! undecided requests to the [`BorderlineSink`], then commits the height.

use std::sync::Arc;

use attest_consensus::{
    save_params, stored_params, ConsensusVerifier, Decision, ScoreInput, Scorer, SystemClock,
    ValidatorSet, VoteExtensionHandler,
};
use attest_store::KvStore;
use attest_types::{ConsensusParams, ValidatorAddress};
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::key_file::FileKeyProvider;
use crate::sink::{AgreedSink, BorderlineSink};
use crate::NodeError;

/// Host-facing verdict on a peer's extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyStatus {
    Accept,
    Reject,
}

/// Counts for one finalized height.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FinalizeSummary {
    pub height: i64,
    pub agreed: usize,
    pub undecided: usize,
    pub rejected_extensions: usize,
}

pub struct VoteExtensionApp {
    handler: VoteExtensionHandler,
    store: Arc<dyn KvStore + Send + Sync>,
    agreed: Arc<dyn AgreedSink>,
    borderline: Arc<dyn BorderlineSink>,
}

impl VoteExtensionApp {
    /// Wrap an already-built handler. Decisions are persisted to `store` on commit.
    pub fn new(
        handler: VoteExtensionHandler,
        store: Arc<dyn KvStore + Send + Sync>,
        agreed: Arc<dyn AgreedSink>,
        borderline: Arc<dyn BorderlineSink>,
    ) -> Self {
        Self {
            handler: handler.with_store(store.clone()),
            store,
            agreed,
            borderline,
        }
    }

    /// Build a validator from its configuration.
    ///
    /// Params already saved in `store` by governance win over
    /// `config.consensus`; otherwise the configured params are saved as the
    /// initial ones.
    pub fn from_config(
        config: &NodeConfig,
        scorer: Arc<dyn Scorer>,
        validators: ValidatorSet,
        store: Arc<dyn KvStore + Send + Sync>,
        agreed: Arc<dyn AgreedSink>,
        borderline: Arc<dyn BorderlineSink>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let params = match stored_params(store.as_ref())? {
            Some(params) => params,
            None => {
                save_params(store.as_ref(), &config.consensus)?;
                config.consensus.clone()
            }
        };

        let keys = Arc::new(FileKeyProvider::open(&config.key_file)?);
        let address = config.address();
        match validators.get(&address) {
            Some(info) if &info.public_key != keys.public_key() => {
                return Err(NodeError::Config(format!(
                    "key file {} does not match the registered key of {address}",
                    config.key_file.display()
                )));
            }
            Some(_) => {}
            None => warn!(validator = %address, "validator not in the active set"),
        }

        let verifier = ConsensusVerifier::new(scorer, keys, params)?;
        let handler = VoteExtensionHandler::new(
            verifier,
            address,
            validators,
            config.weighting(),
            Arc::new(SystemClock::default()),
        );
        Ok(Self::new(handler, store, agreed, borderline))
    }

    pub fn handler(&self) -> &VoteExtensionHandler {
        &self.handler
    }

    pub fn address(&self) -> &ValidatorAddress {
        self.handler.address()
    }

    /// Apply governance-updated params from the next height on.
    pub fn update_params(&mut self, params: ConsensusParams) -> Result<(), NodeError> {
        save_params(self.store.as_ref(), &params)?;
        self.handler.verifier_mut().set_params(params)?;
        info!("consensus params updated");
        Ok(())
    }

    /// Replace the active validator set for subsequent heights.
    pub fn update_validators(&mut self, validators: ValidatorSet) {
        self.handler.set_validators(validators);
    }

    /// PrepareVoteExtension: score `requests` and return this validator's sealed extension.
    pub fn prepare_vote_extension(
        &mut self,
        height: i64,
        requests: Vec<ScoreInput>,
    ) -> Result<Vec<u8>, NodeError> {
        self.handler.begin_height(height, requests);
        Ok(self.handler.extend_vote(height)?)
    }

    /// VerifyVoteExtension: authenticate a peer's extension.
    pub fn verify_vote_extension(
        &self,
        height: i64,
        sender: &ValidatorAddress,
        bytes: &[u8],
    ) -> VerifyStatus {
        match self.handler.verify_vote_extension(height, sender, bytes) {
            Ok(_) => VerifyStatus::Accept,
            Err(e) => {
                warn!(height, validator = %sender, reason = %e, "rejecting vote extension");
                VerifyStatus::Reject
            }
        }
    }

    /// Record a peer's extension delivered with the decided block's votes.
    pub fn receive_vote_extension(
        &mut self,
        height: i64,
        sender: ValidatorAddress,
        bytes: Vec<u8>,
    ) -> Result<bool, NodeError> {
        Ok(self.handler.receive_vote_extension(height, sender, bytes)?)
    }

    /// FinalizeBlock: aggregate, route every decision downstream, then commit.
    ///
    /// If a sink fails the height stays decided but uncommitted, so the call
    /// can be retried.
    pub fn finalize_block(&mut self, height: i64) -> Result<FinalizeSummary, NodeError> {
        let outcome = self.handler.aggregate(height)?;
        let mut summary = FinalizeSummary {
            height,
            rejected_extensions: outcome.rejected.len(),
            ..FinalizeSummary::default()
        };
        for decision in outcome.decisions.values() {
            match decision {
                Decision::Agreed(agreement) => {
                    self.agreed.accept(height, agreement)?;
                    summary.agreed += 1;
                }
                Decision::Undecided(undecided) => {
                    self.borderline.escalate(height, undecided)?;
                    summary.undecided += 1;
                }
            }
        }

        self.handler.commit(height)?;
        info!(
            height,
            agreed = summary.agreed,
            undecided = summary.undecided,
            rejected = summary.rejected_extensions,
            "finalized verification block"
        );
        Ok(summary)
    }

    /// Drop everything collected for `height`.
    pub fn abort_block(&mut self, height: i64) {
        self.handler.abort(height);
    }

    /// Release the scorer and key material.
    pub fn close(&self) -> Result<(), NodeError> {
        Ok(self.handler.verifier().close()?)
    }
}
