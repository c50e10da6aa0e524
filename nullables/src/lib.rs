//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the consensus core (scoring model, key
//! custody, clock, storage) sits behind a trait. This crate provides
//! implementations that:
//! - Return deterministic values
//! - Can be steered programmatically (health, versions, failures, elapsed time)
//! - Never touch the filesystem, network or a real model
//!
//! Usage: swap production implementations for nullables in tests.

pub mod clock;
pub mod keys;
pub mod scorer;
pub mod store;

pub use clock::NullClock;
pub use keys::NullKeyProvider;
pub use scorer::NullScorer;
pub use store::NullKvStore;
