//! Fundamental types for off-chain verification consensus.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! verification results, consensus parameters, validator identities, result
//! hashes, key material and timestamps.

pub mod address;
pub mod error;
pub mod hash;
pub mod keys;
pub mod params;
pub mod result;
pub mod time;

pub use address::{RequestId, ValidatorAddress};
pub use error::ParamsError;
pub use hash::ResultHash;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use params::ConsensusParams;
pub use result::{VerificationResult, VerificationStatus};
pub use time::Timestamp;
