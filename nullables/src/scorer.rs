//! Nullable scorer — a deterministic stand-in for the ML model.

use crate::clock::NullClock;
use attest_consensus::{ScoreInput, ScoreOutput, Scorer, ScorerError};
use attest_crypto::blake2b_256_multi;
use attest_types::RequestId;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A scorer whose outputs are fixed by the test.
///
/// Unscripted requests score the mean feature value on the 0–100 scale with
/// confidence 0.9 and an input hash derived from the features. Scripted
/// requests return exactly what was scripted.
pub struct NullScorer {
    version: Mutex<String>,
    healthy: AtomicBool,
    closed: AtomicBool,
    scripted: Mutex<HashMap<RequestId, ScoreOutput>>,
    failing: Mutex<HashSet<RequestId>>,
    cost: Option<(Arc<NullClock>, u64)>,
    calls: AtomicUsize,
}

impl NullScorer {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: Mutex::new(version.into()),
            healthy: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            scripted: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            cost: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every `score` call advances `clock` by `millis`.
    pub fn with_cost(mut self, clock: Arc<NullClock>, millis: u64) -> Self {
        self.cost = Some((clock, millis));
        self
    }

    /// Fix the output for one request. The model version is the scorer's current one.
    pub fn script(&self, request_id: &str, score: u32, confidence: f64, input_hash: Vec<u8>) {
        let output = ScoreOutput {
            score,
            model_version: self.model_version(),
            confidence,
            input_hash,
        };
        self.scripted
            .lock()
            .unwrap()
            .insert(RequestId::from(request_id), output);
    }

    /// Make scoring `request_id` fail.
    pub fn fail(&self, request_id: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(RequestId::from(request_id));
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_version(&self, version: impl Into<String>) {
        *self.version.lock().unwrap() = version.into();
    }

    /// Number of `score` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn derived_output(&self, input: &ScoreInput) -> ScoreOutput {
        let mean = if input.features.is_empty() {
            0.0
        } else {
            input.features.iter().map(|f| f.value).sum::<f64>() / input.features.len() as f64
        };
        let encoded: Vec<Vec<u8>> = input
            .features
            .iter()
            .flat_map(|f| [f.name.as_bytes().to_vec(), f.value.to_be_bytes().to_vec()])
            .collect();
        let parts: Vec<&[u8]> = encoded.iter().map(Vec::as_slice).collect();
        ScoreOutput {
            score: (mean * 100.0).round().clamp(0.0, 100.0) as u32,
            model_version: self.model_version(),
            confidence: 0.9,
            input_hash: blake2b_256_multi(&parts).to_vec(),
        }
    }
}

impl Scorer for NullScorer {
    fn score(&self, input: &ScoreInput) -> Result<ScoreOutput, ScorerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((clock, millis)) = &self.cost {
            clock.advance(*millis);
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(ScorerError::Closed);
        }
        if self.failing.lock().unwrap().contains(&input.request_id) {
            return Err(ScorerError::Unavailable(format!(
                "scripted failure for {}",
                input.request_id
            )));
        }
        if let Some(output) = self.scripted.lock().unwrap().get(&input.request_id) {
            return Ok(output.clone());
        }
        Ok(self.derived_output(input))
    }

    fn model_version(&self) -> String {
        self.version.lock().unwrap().clone()
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst) && !self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<(), ScorerError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
