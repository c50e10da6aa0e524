//! Identifiers for validators and verification requests.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum byte length of a validator address or request id on the wire.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// The chain address of a validator in the active set.
///
/// Ordered so aggregation can iterate validators deterministically.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorAddress(String);

impl ValidatorAddress {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-empty and short enough to travel inside a vote extension.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.len() <= MAX_IDENTIFIER_LEN
    }
}

impl fmt::Display for ValidatorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ValidatorAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ValidatorAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Stable identifier of one identity-verification request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.len() <= MAX_IDENTIFIER_LEN
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
