//! Verification consensus — agreeing on off-chain ML verification scores.
//!
//! Every validator scores identity-verification requests independently and
//! may land on slightly different numbers. This crate turns those independent
//! results into one decision per request that all honest validators reach:
//!
//! 1. Each validator scores its pending requests and packs the results into a
//!    signed [`VoteExtension`] attached to its consensus vote.
//! 2. Extensions are exchanged by the host consensus engine.
//! 3. Results for the same request are compared under a tolerance; a request
//!    is agreed when enough voting weight backs equivalent results.
//!
//! ## Module overview
//!
//! - [`comparator`] — Tolerance-based equivalence of two results.
//! - [`result_hash`] — Deterministic 32-byte result hash.
//! - [`vote_extension`] — Extension payload and its wire codec.
//! - [`sealed`] — Signed envelope around the extension payload.
//! - [`verifier`] — Façade binding scorer, key provider and params.
//! - [`validator_set`] — Active validators and agreement weighting.
//! - [`aggregation`] — Authenticate extensions and decide per request.
//! - [`handler`] — Per-height state machine driven by the host's vote hooks.
//! - [`decisions`] / [`params`] — Persistence through the host's key/value store.
//! - [`scorer`], [`key_provider`], [`clock`] — Capability ports.
//! - [`error`] — Consensus error types.

pub mod aggregation;
pub mod clock;
pub mod comparator;
pub mod decisions;
pub mod error;
pub mod handler;
pub mod key_provider;
pub mod params;
pub mod result_hash;
pub mod scorer;
pub mod sealed;
pub mod validator_set;
pub mod verifier;
pub mod vote_extension;

pub use aggregation::{
    Agreement, AggregationOutcome, Aggregator, Decision, NoAgreement, ReceivedExtension,
    Rejection,
};
pub use clock::{Clock, SystemClock};
pub use comparator::{compare_results, ComparisonResult};
pub use decisions::{decisions_at, store_decisions};
pub use error::ConsensusError;
pub use handler::{HeightPhase, VoteExtensionHandler};
pub use key_provider::{KeyProvider, KeyProviderError};
pub use params::{load_params, save_params, stored_params};
pub use result_hash::compute_result_hash;
pub use scorer::{Feature, ScoreInput, ScoreOutput, Scorer, ScorerError};
pub use sealed::SealedVoteExtension;
pub use validator_set::{AgreementWeighting, EqualWeight, StakeWeighted, ValidatorInfo, ValidatorSet};
pub use verifier::{ConsensusVerifier, LocalComputation};
pub use vote_extension::{VoteExtension, VoteExtensionResult};
