//! Validator-side host binding for verification consensus.
//!
//! The node crate is where the consensus core meets a running validator:
//! - Loads [`NodeConfig`] from TOML and installs structured logging
//! - Reads the validator's sealing key from disk ([`FileKeyProvider`])
//! - Drives [`VoteExtensionApp`] from the host chain's vote-extension hooks
//! - Hands committed decisions to the score keeper and the appeal queue

pub mod app;
pub mod config;
pub mod error;
pub mod key_file;
pub mod logging;
pub mod sink;

pub use app::{FinalizeSummary, VerifyStatus, VoteExtensionApp};
pub use config::{NodeConfig, WeightingMode};
pub use error::NodeError;
pub use key_file::FileKeyProvider;
pub use logging::{init_logging, LogFormat};
pub use sink::{AgreedSink, BorderlineSink, JsonLinesSink};
