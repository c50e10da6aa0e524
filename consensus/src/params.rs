//! Governance-updated consensus params kept in the host store.

use crate::error::ConsensusError;
use attest_store::{KvStore, StoreError};
use attest_types::ConsensusParams;

const PARAMS_KEY: &[u8] = b"params/consensus";

/// Stored params, if any were ever saved.
pub fn stored_params(store: &dyn KvStore) -> Result<Option<ConsensusParams>, ConsensusError> {
    let Some(bytes) = store.get(PARAMS_KEY)? else {
        return Ok(None);
    };
    let params: ConsensusParams = bincode::deserialize(&bytes)
        .map_err(|e| StoreError::Corruption(format!("consensus params: {e}")))?;
    params.validate()?;
    Ok(Some(params))
}

/// Stored params, or the defaults when none were ever saved.
pub fn load_params(store: &dyn KvStore) -> Result<ConsensusParams, ConsensusError> {
    Ok(stored_params(store)?.unwrap_or_default())
}

/// Validate then store `params`.
pub fn save_params(store: &dyn KvStore, params: &ConsensusParams) -> Result<(), ConsensusError> {
    params.validate()?;
    let bytes =
        bincode::serialize(params).map_err(|e| StoreError::Serialization(e.to_string()))?;
    store.put(PARAMS_KEY, &bytes)?;
    Ok(())
}
