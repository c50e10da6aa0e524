//! Cryptographic primitives for verification consensus.
//!
//! - **Ed25519** for sealing vote extensions and authenticating peers
//! - **Blake2b-256** for result hashes and key fingerprints

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{blake2b_256, blake2b_256_multi};
pub use keys::{key_fingerprint, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
