//! Committed decisions, keyed `decision/<height BE>/<request id>`.

use crate::aggregation::{AggregationOutcome, Decision};
use crate::error::ConsensusError;
use attest_store::{KvStore, StoreError};

const DECISION_PREFIX: &[u8] = b"decision/";

fn height_prefix(height: i64) -> Vec<u8> {
    let mut key = Vec::with_capacity(DECISION_PREFIX.len() + 9);
    key.extend_from_slice(DECISION_PREFIX);
    key.extend_from_slice(&(height as u64).to_be_bytes());
    key.push(b'/');
    key
}

fn decision_key(height: i64, decision: &Decision) -> Vec<u8> {
    let mut key = height_prefix(height);
    key.extend_from_slice(decision.request_id().as_str().as_bytes());
    key
}

/// Write every decision of `outcome`.
pub fn store_decisions(store: &dyn KvStore, outcome: &AggregationOutcome) -> Result<(), ConsensusError> {
    for decision in outcome.decisions.values() {
        let value = bincode::serialize(decision)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        store.put(&decision_key(outcome.height, decision), &value)?;
    }
    Ok(())
}

/// Decisions committed at `height`, ascending by request id.
pub fn decisions_at(store: &dyn KvStore, height: i64) -> Result<Vec<Decision>, ConsensusError> {
    store
        .iter_prefix(&height_prefix(height))?
        .into_iter()
        .map(|(key, value)| -> Result<Decision, ConsensusError> {
            let decision = bincode::deserialize(&value).map_err(|e| {
                StoreError::Corruption(format!("{}: {e}", String::from_utf8_lossy(&key)))
            })?;
            Ok(decision)
        })
        .collect()
}
