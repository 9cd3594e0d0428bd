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
pub struct WriterConfig {
    pub count: usize,
    pub delay_ms: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig { count: 2, delay_ms: 100 }
    }
}

pub struct CounterWriter {
    id: usize,
    gate: Arc<SharedCounter>,
    delay: Duration,
    shutdown: Shutdown,
    state: TaskState,
}

impl CounterWriter {
    pub fn new(id: usize, gate: Arc<SharedCounter>, cfg: &WriterConfig, shutdown: Shutdown) -> CounterWriter {
        CounterWriter {
            id: id,
            gate: gate,
            delay: Duration::from_millis(cfg.delay_ms),
            shutdown: shutdown,
            state: TaskState::Idle,
        }
    }

    /// Increments the counter under exclusive access and returns the new value.
    ///
    /// Fails instead of wrapping when the counter is already at `u64::MAX`.
    pub fn write_once(&mut self) -> Result<u64, GateError> {
        self.transition(TaskState::AcquiringAccess);
        let gate = Arc::clone(&self.gate);
        let written = gate.write(|v| {
            self.advance();
            let next = v.checked_add(1);
            if let Some(next) = next {
                *v = next;
                info!(writer = self.id, value = next, "Writing resource");
            }
            self.advance();
            next
        })?;
        written.ok_or_else(|| GateError::Logic(format!("{} would overflow the counter", self.name())))
    }
}

impl GateTask for CounterWriter {
    const KIND: TaskKind = TaskKind::Writer;

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
        self.write_once()
    }
}
