//! Validator configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use attest_consensus::{AgreementWeighting, EqualWeight, StakeWeighted};
use attest_types::{ConsensusParams, ValidatorAddress};

use crate::logging::LogFormat;
use crate::NodeError;

/// How agreement weight is counted across the validator set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightingMode {
    /// Each validator counts with its voting power.
    #[default]
    Stake,
    /// Each validator counts once.
    Equal,
}

/// Configuration for one validator's verification consensus.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This validator's address in the host chain's validator set.
    #[serde(default)]
    pub validator_address: String,

    /// File holding the hex-encoded Ed25519 seed used to seal extensions.
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub weighting: WeightingMode,

    /// Initial params; governance-stored params take precedence once saved.
    #[serde(default)]
    pub consensus: ConsensusParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_key_file() -> PathBuf {
    PathBuf::from("./validator.key")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            NodeError::Config(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject configurations a validator cannot start with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if !self.address().is_valid() {
            return Err(NodeError::Config(format!(
                "invalid validator_address {:?}",
                self.validator_address
            )));
        }
        self.log_format()?;
        self.consensus
            .validate()
            .map_err(|e| NodeError::Config(format!("consensus: {e}")))
    }

    pub fn address(&self) -> ValidatorAddress {
        ValidatorAddress::from(self.validator_address.as_str())
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    pub fn weighting(&self) -> Box<dyn AgreementWeighting> {
        match self.weighting {
            WeightingMode::Stake => Box::new(StakeWeighted),
            WeightingMode::Equal => Box::new(EqualWeight),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            validator_address: String::new(),
            key_file: default_key_file(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            weighting: WeightingMode::default(),
            consensus: ConsensusParams::default(),
        }
    }
}
