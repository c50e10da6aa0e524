//! End-to-end height rounds across a small validator cluster:
//! score → seal → exchange → authenticate → aggregate → commit.
//!
//! Every validator runs its own handler over nullable collaborators, so the
//! whole exchange is deterministic and in-memory.

use attest_consensus::{
    decisions_at, ConsensusError, ConsensusVerifier, Decision, EqualWeight, Feature, HeightPhase,
    ScoreInput, StakeWeighted, ValidatorInfo, ValidatorSet, VoteExtensionHandler,
};
use attest_nullables::{NullClock, NullKeyProvider, NullKvStore, NullScorer};
use attest_types::{ConsensusParams, RequestId, ValidatorAddress, VerificationStatus};
use std::sync::Arc;

const MODEL: &str = "kyc-model-1.2.0";
const HEIGHT: i64 = 100;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Validator {
    address: ValidatorAddress,
    scorer: Arc<NullScorer>,
    keys: Arc<NullKeyProvider>,
}

fn addr(name: &str) -> ValidatorAddress {
    ValidatorAddress::from(name)
}

fn request(id: &str) -> ScoreInput {
    ScoreInput {
        request_id: RequestId::from(id),
        account_address: format!("acct_{id}"),
        features: vec![Feature {
            name: "liveness".into(),
            value: 0.8,
        }],
    }
}

fn params(tolerance: u32, agreement: f64) -> ConsensusParams {
    ConsensusParams {
        score_tolerance: tolerance,
        min_validator_agreement: agreement,
        ..ConsensusParams::default()
    }
}

fn validator(name: &str, seed: u8) -> Validator {
    Validator {
        address: addr(name),
        scorer: Arc::new(NullScorer::new(MODEL)),
        keys: Arc::new(NullKeyProvider::new([seed; 32])),
    }
}

/// `v1`..`vN`, each with voting power from `powers`.
fn cluster(powers: &[u64]) -> (Vec<Validator>, ValidatorSet) {
    let validators: Vec<Validator> = powers
        .iter()
        .enumerate()
        .map(|(i, _)| validator(&format!("v{}", i + 1), i as u8 + 1))
        .collect();
    let set = ValidatorSet::new(
        validators
            .iter()
            .zip(powers)
            .map(|(v, power)| ValidatorInfo::new(v.address.clone(), v.keys.public_key(), *power)),
    );
    (validators, set)
}

fn handler(v: &Validator, set: &ValidatorSet, params: ConsensusParams) -> VoteExtensionHandler {
    let verifier = ConsensusVerifier::new(v.scorer.clone(), v.keys.clone(), params).unwrap();
    VoteExtensionHandler::new(
        verifier,
        v.address.clone(),
        set.clone(),
        Box::new(StakeWeighted),
        Arc::new(NullClock::new(0)),
    )
}

/// Script the same request on every validator with the given scores.
fn script_scores(validators: &[Validator], id: &str, scores: &[u32]) {
    for (v, score) in validators.iter().zip(scores) {
        v.scorer.script(id, *score, 0.9, vec![0xAB; 32]);
    }
}

/// Run `extend_vote` on every handler and return (sender, bytes) pairs.
fn seal_all(handlers: &mut [VoteExtensionHandler], height: i64) -> Vec<(ValidatorAddress, Vec<u8>)> {
    handlers
        .iter_mut()
        .map(|h| (h.address().clone(), h.extend_vote(height).unwrap()))
        .collect()
}

/// Deliver every peer extension to every other handler.
fn exchange(handlers: &mut [VoteExtensionHandler], sealed: &[(ValidatorAddress, Vec<u8>)], height: i64) {
    for h in handlers.iter_mut() {
        for (sender, bytes) in sealed {
            if sender != h.address() {
                h.verify_vote_extension(height, sender, bytes).unwrap();
                assert!(h
                    .receive_vote_extension(height, sender.clone(), bytes.clone())
                    .unwrap());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 1. Agreement across the cluster
// ---------------------------------------------------------------------------

#[test]
fn three_of_four_within_tolerance_agree_everywhere() {
    let (validators, set) = cluster(&[1, 1, 1, 1]);
    script_scores(&validators, "r1", &[85, 83, 84, 60]);

    let mut handlers: Vec<_> = validators
        .iter()
        .map(|v| handler(v, &set, params(2, 0.67)))
        .collect();
    for h in handlers.iter_mut() {
        h.begin_height(HEIGHT, vec![request("r1")]);
    }
    let sealed = seal_all(&mut handlers, HEIGHT);
    exchange(&mut handlers, &sealed, HEIGHT);

    for h in handlers.iter_mut() {
        let outcome = h.aggregate(HEIGHT).unwrap();
        assert_eq!(outcome.contributors.len(), 4);
        assert!(outcome.rejected.is_empty());

        let Some(Decision::Agreed(agreement)) = outcome.decisions.get(&RequestId::from("r1")) else {
            panic!("r1 should be agreed on {}", h.address());
        };
        assert_eq!(agreement.agreeing_validators, vec![addr("v1"), addr("v2"), addr("v3")]);
        assert!((agreement.agreement_fraction - 0.75).abs() < 1e-9);
        // Equal-weight tie between references goes to the lowest address.
        assert_eq!(agreement.result.score, 85);
        assert_eq!(agreement.result.account_address, "acct_r1");
        assert_eq!(agreement.result.status, VerificationStatus::Success);
        assert_eq!(agreement.result.block_height, HEIGHT);
    }
}

#[test]
fn stricter_threshold_leaves_request_undecided() {
    let (validators, set) = cluster(&[1, 1, 1, 1]);
    script_scores(&validators, "r1", &[85, 83, 84, 60]);

    let mut handlers: Vec<_> = validators
        .iter()
        .map(|v| handler(v, &set, params(2, 0.9)))
        .collect();
    for h in handlers.iter_mut() {
        h.begin_height(HEIGHT, vec![request("r1")]);
    }
    let sealed = seal_all(&mut handlers, HEIGHT);
    exchange(&mut handlers, &sealed, HEIGHT);

    let outcome = handlers[0].aggregate(HEIGHT).unwrap();
    let Some(Decision::Undecided(none)) = outcome.decisions.get(&RequestId::from("r1")) else {
        panic!("r1 should be undecided");
    };
    assert!((none.best_fraction - 0.75).abs() < 1e-9);
    assert!((none.required_fraction - 0.9).abs() < 1e-9);
    assert_eq!(none.participants, 4);
}

#[test]
fn stake_outweighs_headcount() {
    // v4 alone holds most of the stake.
    let (validators, set) = cluster(&[1, 1, 1, 10]);
    script_scores(&validators, "r1", &[85, 85, 85, 40]);

    let mut handlers: Vec<_> = validators
        .iter()
        .map(|v| handler(v, &set, params(0, 0.67)))
        .collect();
    for h in handlers.iter_mut() {
        h.begin_height(HEIGHT, vec![request("r1")]);
    }
    let sealed = seal_all(&mut handlers, HEIGHT);
    exchange(&mut handlers, &sealed, HEIGHT);

    let outcome = handlers[0].aggregate(HEIGHT).unwrap();
    let Some(Decision::Agreed(agreement)) = outcome.decisions.get(&RequestId::from("r1")) else {
        panic!("v4's stake should carry r1");
    };
    assert_eq!(agreement.agreeing_validators, vec![addr("v4")]);
    assert_eq!(agreement.result.score, 40);
}

#[test]
fn equal_weighting_ignores_stake() {
    let (validators, set) = cluster(&[1, 1, 1, 10]);
    script_scores(&validators, "r1", &[85, 85, 85, 40]);

    let verifier =
        ConsensusVerifier::new(validators[0].scorer.clone(), validators[0].keys.clone(), params(0, 0.67))
            .unwrap();
    let mut first = VoteExtensionHandler::new(
        verifier,
        addr("v1"),
        set.clone(),
        Box::new(EqualWeight),
        Arc::new(NullClock::new(0)),
    );
    let mut others: Vec<_> = validators[1..]
        .iter()
        .map(|v| handler(v, &set, params(0, 0.67)))
        .collect();

    first.begin_height(HEIGHT, vec![request("r1")]);
    first.extend_vote(HEIGHT).unwrap();
    for h in others.iter_mut() {
        h.begin_height(HEIGHT, vec![request("r1")]);
        let bytes = h.extend_vote(HEIGHT).unwrap();
        first
            .receive_vote_extension(HEIGHT, h.address().clone(), bytes)
            .unwrap();
    }

    let outcome = first.aggregate(HEIGHT).unwrap();
    let Some(Decision::Agreed(agreement)) = outcome.decisions.get(&RequestId::from("r1")) else {
        panic!("three equal votes out of four should carry r1");
    };
    assert_eq!(agreement.result.score, 85);
    assert!((agreement.agreement_fraction - 0.75).abs() < 1e-9);
}

#[test]
fn absent_validators_count_against_agreement() {
    let (validators, set) = cluster(&[1, 1, 1, 1]);
    script_scores(&validators, "r1", &[70, 70, 70, 70]);

    let mut handlers: Vec<_> = validators[..2]
        .iter()
        .map(|v| handler(v, &set, params(0, 0.67)))
        .collect();
    for h in handlers.iter_mut() {
        h.begin_height(HEIGHT, vec![request("r1")]);
    }
    let sealed = seal_all(&mut handlers, HEIGHT);
    exchange(&mut handlers, &sealed, HEIGHT);

    let outcome = handlers[0].aggregate(HEIGHT).unwrap();
    let decision = &outcome.decisions[&RequestId::from("r1")];
    assert!(!decision.is_agreed(), "2 of 4 is below 0.67");
}

// ---------------------------------------------------------------------------
// 2. Authentication failures
// ---------------------------------------------------------------------------

#[test]
fn tampered_extension_is_rejected_but_block_proceeds() {
    let (validators, set) = cluster(&[1, 1, 1, 1]);
    script_scores(&validators, "r1", &[85, 85, 85, 85]);

    let mut handlers: Vec<_> = validators
        .iter()
        .map(|v| handler(v, &set, params(0, 0.67)))
        .collect();
    for h in handlers.iter_mut() {
        h.begin_height(HEIGHT, vec![request("r1")]);
    }
    let mut sealed = seal_all(&mut handlers, HEIGHT);
    let last = sealed[3].1.len() - 1;
    sealed[3].1[last] ^= 0xFF;

    let err = handlers[0]
        .verify_vote_extension(HEIGHT, &sealed[3].0, &sealed[3].1)
        .unwrap_err();
    assert!(matches!(err, ConsensusError::SignatureInvalid(_)));

    for (sender, bytes) in &sealed[1..] {
        handlers[0]
            .receive_vote_extension(HEIGHT, sender.clone(), bytes.clone())
            .unwrap();
    }
    let outcome = handlers[0].aggregate(HEIGHT).unwrap();
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].validator, addr("v4"));
    assert_eq!(outcome.contributors, vec![addr("v1"), addr("v2"), addr("v3")]);
    assert!(outcome.decisions[&RequestId::from("r1")].is_agreed());
}

#[test]
fn unknown_validator_is_rejected() {
    let (validators, set) = cluster(&[1, 1, 1]);
    let outsider = validator("v9", 9);
    let outsider_set = ValidatorSet::new([ValidatorInfo::new(
        outsider.address.clone(),
        outsider.keys.public_key(),
        1,
    )]);
    let mut rogue = handler(&outsider, &outsider_set, params(0, 0.67));
    rogue.begin_height(HEIGHT, vec![request("r1")]);
    let bytes = rogue.extend_vote(HEIGHT).unwrap();

    let mut local = handler(&validators[0], &set, params(0, 0.67));
    local.begin_height(HEIGHT, vec![request("r1")]);
    let err = local
        .verify_vote_extension(HEIGHT, &outsider.address, &bytes)
        .unwrap_err();
    assert!(matches!(err, ConsensusError::UnknownValidator(_)));
}

#[test]
fn replayed_extension_under_another_sender_is_rejected() {
    let (validators, set) = cluster(&[1, 1, 1]);
    let mut handlers: Vec<_> = validators
        .iter()
        .map(|v| handler(v, &set, params(0, 0.67)))
        .collect();
    for h in handlers.iter_mut() {
        h.begin_height(HEIGHT, vec![request("r1")]);
    }
    let sealed = seal_all(&mut handlers, HEIGHT);

    let err = handlers[0]
        .verify_vote_extension(HEIGHT, &addr("v3"), &sealed[1].1)
        .unwrap_err();
    assert!(matches!(err, ConsensusError::SignatureInvalid(_)));
}

#[test]
fn extension_for_another_height_is_rejected() {
    let (validators, set) = cluster(&[1, 1]);
    let mut peer = handler(&validators[1], &set, params(0, 0.67));
    peer.begin_height(HEIGHT + 1, vec![request("r1")]);
    let bytes = peer.extend_vote(HEIGHT + 1).unwrap();

    let mut local = handler(&validators[0], &set, params(0, 0.67));
    local.begin_height(HEIGHT, vec![request("r1")]);
    let err = local
        .verify_vote_extension(HEIGHT, &addr("v2"), &bytes)
        .unwrap_err();
    assert!(matches!(
        err,
        ConsensusError::HeightMismatch { expected: HEIGHT, actual } if actual == HEIGHT + 1
    ));
}

#[test]
fn equivocating_validator_is_excluded() {
    let (validators, set) = cluster(&[1, 1, 1, 1]);
    script_scores(&validators, "r1", &[85, 85, 85, 85]);

    let mut handlers: Vec<_> = validators
        .iter()
        .map(|v| handler(v, &set, params(0, 0.5)))
        .collect();
    for h in handlers.iter_mut() {
        h.begin_height(HEIGHT, vec![request("r1"), request("r2")]);
    }
    let sealed = seal_all(&mut handlers, HEIGHT);

    // v2 signs a second, different extension for the same height.
    let mut twin = handler(&validators[1], &set, params(0, 0.5));
    twin.begin_height(HEIGHT, vec![request("r1")]);
    let conflicting = twin.extend_vote(HEIGHT).unwrap();

    let local = &mut handlers[0];
    for (sender, bytes) in &sealed[1..] {
        local
            .receive_vote_extension(HEIGHT, sender.clone(), bytes.clone())
            .unwrap();
    }
    local
        .receive_vote_extension(HEIGHT, addr("v2"), conflicting)
        .unwrap();
    // Exact resends are harmless.
    local
        .receive_vote_extension(HEIGHT, sealed[2].0.clone(), sealed[2].1.clone())
        .unwrap();

    let outcome = local.aggregate(HEIGHT).unwrap();
    assert_eq!(outcome.contributors, vec![addr("v1"), addr("v3"), addr("v4")]);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].validator, addr("v2"));
}

// ---------------------------------------------------------------------------
// 3. Local scoring policy
// ---------------------------------------------------------------------------

#[test]
fn unhealthy_model_abstains_with_signed_empty_extension() {
    let (validators, set) = cluster(&[1, 1]);
    validators[1].scorer.set_healthy(false);

    let mut local = handler(&validators[0], &set, params(0, 0.67));
    let mut sick = handler(&validators[1], &set, params(0, 0.67));
    local.begin_height(HEIGHT, vec![request("r1")]);
    sick.begin_height(HEIGHT, vec![request("r1")]);

    let bytes = sick.extend_vote(HEIGHT).unwrap();
    assert!(sick.local_results().is_empty());
    assert_eq!(validators[1].scorer.calls(), 0);

    let extension = local.verify_vote_extension(HEIGHT, &addr("v2"), &bytes).unwrap();
    assert!(extension.verification_results.is_empty());
}

#[test]
fn stale_model_abstains_when_version_is_required() {
    let (validators, set) = cluster(&[1]);
    validators[0].scorer.set_version("kyc-model-1.1.0");
    let required = ConsensusParams {
        required_model_version: Some(MODEL.to_string()),
        ..params(0, 0.67)
    };

    let mut h = handler(&validators[0], &set, required);
    h.begin_height(HEIGHT, vec![request("r1")]);
    h.extend_vote(HEIGHT).unwrap();
    assert!(h.local_results().is_empty());
}

#[test]
fn slow_requests_are_left_out_of_the_extension() {
    let (validators, set) = cluster(&[1]);
    let clock = Arc::new(NullClock::new(0));
    let scorer = Arc::new(NullScorer::new(MODEL).with_cost(clock.clone(), 400));
    let verifier = ConsensusVerifier::new(scorer, validators[0].keys.clone(), params(0, 0.67)).unwrap();
    let mut h = VoteExtensionHandler::new(verifier, addr("v1"), set, Box::new(StakeWeighted), clock);

    h.begin_height(HEIGHT, vec![request("r1"), request("r2"), request("r3"), request("r4")]);
    h.extend_vote(HEIGHT).unwrap();

    // 1000 ms budget at 400 ms per request: r1 at 400, r2 at 800, r3 ends at 1200.
    let ids: Vec<&str> = h.local_results().iter().map(|r| r.request_id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r2"]);
}

#[test]
fn failing_request_does_not_block_the_rest() {
    let (validators, set) = cluster(&[1]);
    validators[0].scorer.fail("r2");

    let mut h = handler(&validators[0], &set, params(0, 0.67));
    h.begin_height(HEIGHT, vec![request("r1"), request("r2"), request("r3")]);
    h.extend_vote(HEIGHT).unwrap();
    let ids: Vec<&str> = h.local_results().iter().map(|r| r.request_id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r3"]);
}

// ---------------------------------------------------------------------------
// 4. Height lifecycle
// ---------------------------------------------------------------------------

#[test]
fn late_extension_is_ignored_after_aggregation() {
    let (validators, set) = cluster(&[1, 1]);
    let mut handlers: Vec<_> = validators
        .iter()
        .map(|v| handler(v, &set, params(0, 0.67)))
        .collect();
    for h in handlers.iter_mut() {
        h.begin_height(HEIGHT, vec![request("r1")]);
    }
    let sealed = seal_all(&mut handlers, HEIGHT);

    let before = handlers[0].aggregate(HEIGHT).unwrap().contributors.clone();
    assert_eq!(before, vec![addr("v1")]);
    assert!(!handlers[0]
        .receive_vote_extension(HEIGHT, sealed[1].0.clone(), sealed[1].1.clone())
        .unwrap());
    assert_eq!(handlers[0].aggregate(HEIGHT).unwrap().contributors, before);
}

#[test]
fn aggregate_is_idempotent() {
    let (validators, set) = cluster(&[1, 1, 1]);
    script_scores(&validators, "r1", &[50, 51, 90]);
    let mut handlers: Vec<_> = validators
        .iter()
        .map(|v| handler(v, &set, params(1, 0.6)))
        .collect();
    for h in handlers.iter_mut() {
        h.begin_height(HEIGHT, vec![request("r1")]);
    }
    let sealed = seal_all(&mut handlers, HEIGHT);
    exchange(&mut handlers, &sealed, HEIGHT);

    let first = handlers[0].aggregate(HEIGHT).unwrap().decisions.clone();
    let second = handlers[0].aggregate(HEIGHT).unwrap().decisions.clone();
    assert_eq!(first, second);
    assert_eq!(handlers[0].phase(), Some(HeightPhase::Decided));
}

#[test]
fn wrong_phase_and_height_are_errors() {
    let (validators, set) = cluster(&[1]);
    let mut h = handler(&validators[0], &set, params(0, 0.67));

    assert!(matches!(h.extend_vote(HEIGHT), Err(ConsensusError::NoActiveHeight)));

    h.begin_height(HEIGHT, vec![request("r1")]);
    assert!(matches!(
        h.extend_vote(HEIGHT + 1),
        Err(ConsensusError::HeightMismatch { .. })
    ));
    assert!(matches!(
        h.commit(HEIGHT),
        Err(ConsensusError::InvalidPhase { expected: HeightPhase::Decided, .. })
    ));

    h.extend_vote(HEIGHT).unwrap();
    assert!(matches!(
        h.extend_vote(HEIGHT),
        Err(ConsensusError::InvalidPhase { expected: HeightPhase::Collecting, .. })
    ));
}

#[test]
fn commit_persists_and_abort_discards() {
    let (validators, set) = cluster(&[1, 1, 1]);
    script_scores(&validators, "r1", &[80, 80, 80]);
    script_scores(&validators, "r2", &[10, 50, 90]);
    let store = Arc::new(NullKvStore::new());

    let mut handlers: Vec<_> = validators
        .iter()
        .map(|v| handler(v, &set, params(0, 0.67)))
        .collect();
    handlers[0] = handler(&validators[0], &set, params(0, 0.67)).with_store(store.clone());

    // An aborted height leaves nothing behind.
    handlers[0].begin_height(HEIGHT - 1, vec![request("r1")]);
    handlers[0].extend_vote(HEIGHT - 1).unwrap();
    handlers[0].aggregate(HEIGHT - 1).unwrap();
    handlers[0].abort(HEIGHT - 1);
    assert_eq!(handlers[0].height(), None);
    assert!(decisions_at(store.as_ref(), HEIGHT - 1).unwrap().is_empty());

    for h in handlers.iter_mut() {
        h.begin_height(HEIGHT, vec![request("r1"), request("r2")]);
    }
    let sealed = seal_all(&mut handlers, HEIGHT);
    exchange(&mut handlers, &sealed, HEIGHT);
    handlers[0].aggregate(HEIGHT).unwrap();
    assert!(decisions_at(store.as_ref(), HEIGHT).unwrap().is_empty());

    let outcome = handlers[0].commit(HEIGHT).unwrap();
    assert_eq!(handlers[0].height(), None);

    let stored = decisions_at(store.as_ref(), HEIGHT).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].request_id().as_str(), "r1");
    assert!(stored[0].is_agreed());
    assert!(!stored[1].is_agreed());
    assert_eq!(stored, outcome.decisions.into_values().collect::<Vec<_>>());
}

// ---------------------------------------------------------------------------
// 5. Input hashes and request scope
// ---------------------------------------------------------------------------

/// Script `r1` with the same score everywhere but a per-validator input hash.
fn script_hashes(validators: &[Validator], hash: impl Fn(usize) -> Vec<u8>) {
    for (i, v) in validators.iter().enumerate() {
        v.scorer.script("r1", 75, 0.9, hash(i));
    }
}

fn run_round(
    validators: &[Validator],
    set: &ValidatorSet,
    requests: &[Vec<ScoreInput>],
) -> Vec<VoteExtensionHandler> {
    let mut handlers: Vec<_> = validators
        .iter()
        .map(|v| handler(v, set, params(0, 0.67)))
        .collect();
    for (h, requests) in handlers.iter_mut().zip(requests) {
        h.begin_height(HEIGHT, requests.clone());
    }
    let sealed = seal_all(&mut handlers, HEIGHT);
    exchange(&mut handlers, &sealed, HEIGHT);
    handlers
}

#[test]
fn inputs_differing_in_leading_bytes_leave_request_undecided() {
    let (validators, set) = cluster(&[1, 1, 1, 1]);
    script_hashes(&validators, |i| {
        let mut hash = vec![0xAB; 32];
        hash[3] = i as u8;
        hash
    });

    let mut handlers = run_round(&validators, &set, &vec![vec![request("r1")]; 4]);
    for h in handlers.iter_mut() {
        let outcome = h.aggregate(HEIGHT).unwrap();
        let Some(Decision::Undecided(none)) = outcome.decisions.get(&RequestId::from("r1")) else {
            panic!("diverging inputs must not agree on {}", h.address());
        };
        assert!((none.best_fraction - 0.25).abs() < 1e-9);
        assert_eq!(none.participants, 4);
    }
}

#[test]
fn inputs_differing_past_the_truncated_prefix_still_agree() {
    let (validators, set) = cluster(&[1, 1, 1, 1]);
    script_hashes(&validators, |i| {
        let mut hash = vec![0xAB; 32];
        hash[8] = i as u8;
        hash[31] = i as u8;
        hash
    });

    let mut handlers = run_round(&validators, &set, &vec![vec![request("r1")]; 4]);
    for h in handlers.iter_mut() {
        let outcome = h.aggregate(HEIGHT).unwrap();
        let Some(Decision::Agreed(agreement)) = outcome.decisions.get(&RequestId::from("r1")) else {
            panic!("only the 8-byte prefix travels, so {} should agree", h.address());
        };
        assert_eq!(agreement.agreeing_validators.len(), 4);
        assert_eq!(agreement.result.input_hash, vec![0xAB; 8]);
    }
}

#[test]
fn request_scheduled_by_one_validator_is_never_decided() {
    // v4 alone would clear 0.67 if its extra request were counted.
    let (validators, set) = cluster(&[10, 10, 10, 70]);
    script_scores(&validators, "r1", &[80, 80, 80, 80]);
    validators[3].scorer.script("ghost", 99, 0.9, vec![0xAB; 32]);

    let mut requests = vec![vec![request("r1")]; 3];
    requests.push(vec![request("r1"), request("ghost")]);
    let mut handlers = run_round(&validators, &set, &requests);

    for h in handlers[..3].iter_mut() {
        let outcome = h.aggregate(HEIGHT).unwrap();
        assert_eq!(outcome.decisions.len(), 1);
        assert!(outcome.decisions[&RequestId::from("r1")].is_agreed());
        assert!(!outcome.decisions.contains_key(&RequestId::from("ghost")));
        assert_eq!(outcome.unscheduled, vec![(addr("v4"), RequestId::from("ghost"))]);
        assert!(outcome.rejected.is_empty());
    }

    // v4 did schedule it and decides it from its own view.
    let outcome = handlers[3].aggregate(HEIGHT).unwrap();
    assert!(outcome.decisions[&RequestId::from("ghost")].is_agreed());
    assert!(outcome.unscheduled.is_empty());
}
