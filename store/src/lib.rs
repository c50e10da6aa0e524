//! Abstract storage for verification consensus.
//!
//! The host chain owns the actual database. This crate defines the narrow
//! key/value surface the consensus core needs, so the core receives its
//! storage handle at construction instead of reaching for a global one.

pub mod error;
pub mod kv;

pub use error::StoreError;
pub use kv::{prefix_end, KvStore};
