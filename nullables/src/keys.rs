//! Nullable key provider — a fixed seed held in memory.

use attest_consensus::{KeyProvider, KeyProviderError};
use attest_crypto::{key_fingerprint, keypair_from_seed};
use attest_types::{PrivateKey, PublicKey};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct NullKeyProvider {
    seed: [u8; 32],
    public: PublicKey,
    available: AtomicBool,
    closed: AtomicBool,
}

impl NullKeyProvider {
    pub fn new(seed: [u8; 32]) -> Self {
        let public = keypair_from_seed(&seed).public;
        Self {
            seed,
            public,
            available: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        }
    }

    /// Public half, for registering this validator in a test validator set.
    pub fn public_key(&self) -> PublicKey {
        self.public.clone()
    }

    /// Make `private_key` fail, as if the HSM went away.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl KeyProvider for NullKeyProvider {
    fn private_key(&self) -> Result<PrivateKey, KeyProviderError> {
        if self.is_closed() {
            return Err(KeyProviderError::Closed);
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(KeyProviderError::Unavailable("null key provider disabled".into()));
        }
        Ok(PrivateKey(self.seed))
    }

    fn key_fingerprint(&self) -> String {
        key_fingerprint(&self.public)
    }

    fn close(&self) -> Result<(), KeyProviderError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
