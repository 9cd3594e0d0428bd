use std::sync::Arc;
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};
use tracing::info;

use crate::core::SharedCounter;
use crate::errors::GateError;
use crate::shutdown::Shutdown;
use crate::task::{GateTask, TaskKind, TaskState};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub count: usize,
    // Simulated work after each read.
    pub delay_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig { count: 5, delay_ms: 100 }
    }
}

pub struct CounterReader {
    id: usize,
    gate: Arc<SharedCounter>,
    delay: Duration,
    shutdown: Shutdown,
    state: TaskState,
}

impl CounterReader {
    pub fn new(id: usize, gate: Arc<SharedCounter>, cfg: &ReaderConfig, shutdown: Shutdown) -> CounterReader {
        CounterReader {
            id: id,
            gate: gate,
            delay: Duration::from_millis(cfg.delay_ms),
            shutdown: shutdown,
            state: TaskState::Idle,
        }
    }

    /// Joins the reader cohort, observes the counter once and leaves.
    pub fn read_once(&mut self) -> Result<u64, GateError> {
        self.transition(TaskState::AcquiringAccess);
        let gate = Arc::clone(&self.gate);
        let value = gate.read(|v| {
            self.advance();
            info!(reader = self.id, value = *v, "Reading resource");
            // the cohort guard drops right after this closure returns.
            self.advance();
            *v
        })?;
        Ok(value)
    }
}

impl GateTask for CounterReader {
    const KIND: TaskKind = TaskKind::Reader;

    fn id(&self) -> usize {
        self.id
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    fn state(&self) -> TaskState {
        self.state
    }

    fn set_state(&mut self, state: TaskState) {
        self.state = state;
    }

    fn access_once(&mut self) -> Result<u64, GateError> {
        self.read_once()
    }
}
