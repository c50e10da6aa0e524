//! Ed25519 key derivation and fingerprints.

use crate::hash::blake2b_256;
use attest_types::{KeyPair, PrivateKey, PublicKey};
use ed25519_dalek::SigningKey;

/// Number of digest bytes kept in a key fingerprint.
const FINGERPRINT_LEN: usize = 8;

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    let signing_key = SigningKey::from_bytes(&private.0);
    PublicKey(signing_key.verifying_key().to_bytes())
}

/// Reconstruct a full key pair from a private key.
pub fn keypair_from_private(private: PrivateKey) -> KeyPair {
    let public = public_from_private(&private);
    KeyPair { public, private }
}

/// Derive a key pair from a 32-byte seed (deterministic).
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    keypair_from_private(PrivateKey(*seed))
}

/// Stable short identifier of a public key: hex of the first 8 bytes of its Blake2b digest.
///
/// Key providers report this value and the validator set derives the same
/// string from the registered public key, so the two can be compared.
pub fn key_fingerprint(public: &PublicKey) -> String {
    let digest = blake2b_256(public.as_bytes());
    hex::encode(&digest[..FINGERPRINT_LEN])
}
