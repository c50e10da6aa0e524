//! Deterministic content hash of a verification result.

use attest_crypto::blake2b_256_multi;
use attest_types::{ResultHash, VerificationResult};

const RESULT_HASH_DOMAIN: &[u8] = b"attest/result/v1";

/// Hash every field of `result` into a 32-byte digest.
///
/// Variable-length fields are length-prefixed and integers are big-endian,
/// so the digest is identical on every platform.
pub fn compute_result_hash(result: &VerificationResult) -> ResultHash {
    let request_id = result.request_id.as_str().as_bytes();
    let account = result.account_address.as_bytes();
    let model = result.model_version.as_bytes();

    let request_id_len = len_prefix(request_id);
    let account_len = len_prefix(account);
    let model_len = len_prefix(model);
    let input_hash_len = len_prefix(&result.input_hash);
    let score = result.score.to_be_bytes();
    let status = [result.status.as_byte()];
    let height = result.block_height.to_be_bytes();

    ResultHash::new(blake2b_256_multi(&[
        RESULT_HASH_DOMAIN,
        &request_id_len,
        request_id,
        &account_len,
        account,
        &score,
        &status,
        &model_len,
        model,
        &input_hash_len,
        &result.input_hash,
        &height,
    ]))
}

fn len_prefix(bytes: &[u8]) -> [u8; 4] {
    (bytes.len() as u32).to_be_bytes()
}
