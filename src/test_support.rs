//! Shared test doubles for the link and pipeline tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::controller::{InputSnapshot, SnapshotSource};
use crate::link::{LinkError, LinkSession};

/// Write log: issue timestamp plus the bytes that went out.
pub type WriteLog = Arc<Mutex<Vec<(Instant, Vec<u8>)>>>;

/// Session that records every write with its timestamp.
pub struct RecordingSession {
    log: WriteLog,
}

impl RecordingSession {
    pub fn new() -> (Self, WriteLog) {
        let log: WriteLog = Arc::new(Mutex::new(Vec::new()));
        (Self { log: log.clone() }, log)
    }
}

#[async_trait]
impl LinkSession for RecordingSession {
    async fn write(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        self.log
            .lock()
            .unwrap()
            .push((Instant::now(), payload.to_vec()));
        Ok(())
    }

    fn peripheral(&self) -> &str {
        "test-peripheral"
    }
}

/// Session whose every write fails, as if the peripheral disconnected.
pub struct FailingSession;

#[async_trait]
impl LinkSession for FailingSession {
    async fn write(&mut self, _payload: &[u8]) -> Result<(), LinkError> {
        Err(LinkError::WriteError("peripheral gone".to_string()))
    }

    fn peripheral(&self) -> &str {
        "failing-peripheral"
    }
}

/// Snapshot source that replays a script, one entry per frame.
///
/// Returns `None` once the script is exhausted.
pub struct ScriptedSource {
    script: VecDeque<Option<InputSnapshot>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Option<InputSnapshot>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl SnapshotSource for ScriptedSource {
    fn sample(&mut self) -> Option<InputSnapshot> {
        self.script.pop_front().flatten()
    }
}
