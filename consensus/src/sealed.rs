//! Signed envelope around a marshaled vote extension.
//!
//! Wire layout: `b"AVS"`, one version byte, then a bincode body holding the
//! extension bytes, the signer's key fingerprint and an Ed25519 signature over
//! `SEAL_DOMAIN || payload`.

use crate::error::ConsensusError;
use crate::key_provider::{KeyProvider, KeyProviderError};
use crate::validator_set::ValidatorSet;
use crate::vote_extension::{VoteExtension, MAX_EXTENSION_SIZE};
use attest_crypto::{key_fingerprint, public_from_private, sign_message, verify_signature};
use attest_types::{Signature, ValidatorAddress};
use bincode::Options;
use serde::{Deserialize, Serialize};

const SEAL_DOMAIN: &[u8] = b"attest/vote-extension/v1";
const SEAL_MAGIC: &[u8; 3] = b"AVS";
const SEAL_VERSION: u8 = 1;
const HEADER_LEN: usize = SEAL_MAGIC.len() + 1;

/// Fingerprint plus signature plus length prefixes stay well under this.
const SEAL_OVERHEAD: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedVoteExtension {
    /// Output of [`VoteExtension::marshal`].
    pub payload: Vec<u8>,
    pub key_fingerprint: String,
    pub signature: Signature,
}

fn seal_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .with_limit((MAX_EXTENSION_SIZE + SEAL_OVERHEAD) as u64)
        .reject_trailing_bytes()
}

fn signing_message(payload: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(SEAL_DOMAIN.len() + payload.len());
    msg.extend_from_slice(SEAL_DOMAIN);
    msg.extend_from_slice(payload);
    msg
}

impl SealedVoteExtension {
    /// Marshal `extension` and sign it with the provider's key.
    pub fn seal(extension: &VoteExtension, keys: &dyn KeyProvider) -> Result<Self, ConsensusError> {
        let payload = extension.marshal()?;
        let private = keys.private_key()?;

        let reported = keys.key_fingerprint();
        let derived = key_fingerprint(&public_from_private(&private));
        if reported != derived {
            return Err(KeyProviderError::FingerprintMismatch { reported, derived }.into());
        }

        let signature = sign_message(&signing_message(&payload), &private);
        Ok(Self {
            payload,
            key_fingerprint: derived,
            signature,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ConsensusError> {
        let body = seal_options()
            .serialize(self)
            .map_err(|e| ConsensusError::InvalidExtension(format!("encode envelope: {e}")))?;
        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(SEAL_MAGIC);
        out.push(SEAL_VERSION);
        out.extend_from_slice(&body);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConsensusError> {
        if bytes.len() < HEADER_LEN || &bytes[..SEAL_MAGIC.len()] != SEAL_MAGIC {
            return Err(ConsensusError::InvalidExtension(
                "missing envelope header".to_string(),
            ));
        }
        if bytes[SEAL_MAGIC.len()] != SEAL_VERSION {
            return Err(ConsensusError::InvalidExtension(format!(
                "unsupported envelope version {}",
                bytes[SEAL_MAGIC.len()]
            )));
        }
        seal_options()
            .deserialize(&bytes[HEADER_LEN..])
            .map_err(|e| ConsensusError::InvalidExtension(format!("decode envelope: {e}")))
    }

    /// Decode the payload and authenticate it against the active set.
    ///
    /// `sender` is the validator the host consensus engine attributes the vote
    /// to; the extension must claim the same address.
    pub fn open(
        &self,
        validators: &ValidatorSet,
        sender: &ValidatorAddress,
    ) -> Result<VoteExtension, ConsensusError> {
        let extension = VoteExtension::unmarshal(&self.payload)?;
        let claimed = &extension.validator_address;
        if claimed != sender {
            return Err(ConsensusError::SignatureInvalid(sender.clone()));
        }

        let validator = validators
            .get(claimed)
            .ok_or_else(|| ConsensusError::UnknownValidator(claimed.clone()))?;
        if validator.key_fingerprint() != self.key_fingerprint {
            return Err(ConsensusError::SignatureInvalid(claimed.clone()));
        }
        if !verify_signature(
            &signing_message(&self.payload),
            &self.signature,
            &validator.public_key,
        ) {
            return Err(ConsensusError::SignatureInvalid(claimed.clone()));
        }
        Ok(extension)
    }
}
