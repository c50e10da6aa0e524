//! Downstream consumers of committed decisions.

use std::io::Write;
use std::sync::Mutex;

use attest_consensus::{Agreement, NoAgreement};
use serde::Serialize;

use crate::NodeError;

/// Receives results the validator set agreed on (the score keeper).
///
/// A block may be finalized again after a failed delivery, so implementations
/// must tolerate seeing the same `(height, request)` twice.
pub trait AgreedSink: Send + Sync {
    fn accept(&self, height: i64, agreement: &Agreement) -> Result<(), NodeError>;
}

/// Receives requests that found no agreement (the appeal queue).
pub trait BorderlineSink: Send + Sync {
    fn escalate(&self, height: i64, undecided: &NoAgreement) -> Result<(), NodeError>;
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Line<'a> {
    Agreed {
        height: i64,
        #[serde(flatten)]
        agreement: &'a Agreement,
    },
    Borderline {
        height: i64,
        #[serde(flatten)]
        undecided: &'a NoAgreement,
    },
}

/// Writes each decision as one JSON object per line.
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> Result<W, NodeError> {
        self.out
            .into_inner()
            .map_err(|_| NodeError::Sink("writer lock poisoned".into()))
    }

    fn write_line(&self, line: &Line<'_>) -> Result<(), NodeError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| NodeError::Sink("writer lock poisoned".into()))?;
        serde_json::to_writer(&mut *out, line).map_err(|e| NodeError::Sink(e.to_string()))?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> AgreedSink for JsonLinesSink<W> {
    fn accept(&self, height: i64, agreement: &Agreement) -> Result<(), NodeError> {
        self.write_line(&Line::Agreed { height, agreement })
    }
}

impl<W: Write + Send> BorderlineSink for JsonLinesSink<W> {
    fn escalate(&self, height: i64, undecided: &NoAgreement) -> Result<(), NodeError> {
        self.write_line(&Line::Borderline { height, undecided })
    }
}
