#![no_main]

use attest_consensus::{SealedVoteExtension, ValidatorSet, VoteExtension};
use attest_types::ValidatorAddress;
use libfuzzer_sys::fuzz_target;

// Arbitrary bytes fed to both decoders must never panic.
fuzz_target!(|data: &[u8]| {
    // 1. Raw extension payload
    if let Ok(ext) = VoteExtension::unmarshal(data) {
        // Anything that decodes is valid and re-encodes to the same bytes.
        assert!(ext.validate().is_ok());
        let encoded = ext.marshal().expect("decoded extension must re-encode");
        assert_eq!(encoded, data);
    }

    // 2. Sealed envelope, opened against an empty set
    if let Ok(sealed) = SealedVoteExtension::from_bytes(data) {
        let _ = sealed.open(&ValidatorSet::default(), &ValidatorAddress::from("fuzz"));
        if let Ok(bytes) = sealed.to_bytes() {
            assert_eq!(bytes, data);
        }
    }
});
