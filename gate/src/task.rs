use std::fmt;
use std::thread;
use std::time::Duration;

use tracing::trace;

use crate::errors::GateError;
use crate::shutdown::Shutdown;

/// Where a reader or writer task is in its loop.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    AcquiringAccess,
    AccessingResource,
    ReleasingAccess,
    Sleeping,
    // Terminal. Reached when the shutdown token fires or the iteration budget runs out.
    Stopped,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        self == TaskState::Stopped
    }

    /// The state a task moves to after this one within an iteration.
    pub fn next(self) -> TaskState {
        match self {
            TaskState::Idle => TaskState::AcquiringAccess,
            TaskState::AcquiringAccess => TaskState::AccessingResource,
            TaskState::AccessingResource => TaskState::ReleasingAccess,
            TaskState::ReleasingAccess => TaskState::Sleeping,
            TaskState::Sleeping => TaskState::Idle,
            TaskState::Stopped => TaskState::Stopped,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Reader,
    Writer,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Reader => write!(f, "reader"),
            TaskKind::Writer => write!(f, "writer"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TaskSummary {
    pub id: usize,
    pub kind: TaskKind,
    pub iterations: u64,
}

impl TaskSummary {
    pub fn name(&self) -> String {
        task_name(self.kind, self.id)
    }
}

#[inline]
pub fn task_name(kind: TaskKind, id: usize) -> String {
    format!("{}-{}", kind, id)
}

/// A reader or writer loop over the gate.
///
/// Implementors provide one access; the loop, the shutdown check and the
/// simulated-work delay are shared.
pub trait GateTask {
    const KIND: TaskKind;

    fn id(&self) -> usize;
    fn delay(&self) -> Duration;
    fn shutdown(&self) -> &Shutdown;
    fn state(&self) -> TaskState;
    fn set_state(&mut self, state: TaskState);

    /// Performs one access and returns the value observed or written.
    fn access_once(&mut self) -> Result<u64, GateError>;

    fn name(&self) -> String {
        task_name(Self::KIND, self.id())
    }

    fn transition(&mut self, next: TaskState) {
        trace!(task = %self.name(), from = ?self.state(), to = ?next, "state change");
        self.set_state(next);
    }

    /// Moves to the state that follows the current one within an iteration.
    fn advance(&mut self) {
        let next = self.state().next();
        self.transition(next);
    }

    /// Loops until the shutdown token fires or `iterations` accesses are done.
    /// `None` means no budget.
    fn run(&mut self, iterations: Option<u64>) -> Result<TaskSummary, GateError> {
        let mut done = 0u64;
        self.transition(TaskState::Idle);
        let result = loop {
            if self.shutdown().is_triggered() || iterations.map_or(false, |n| done >= n) {
                break Ok(());
            }
            if let Err(e) = self.access_once() {
                break Err(e);
            }
            done += 1;
            self.advance();
            debug_assert_eq!(self.state(), TaskState::Sleeping);
            let delay = self.delay();
            if delay != Duration::from_millis(0) {
                thread::sleep(delay);
            }
            self.advance();
        };
        self.transition(TaskState::Stopped);
        result?;
        Ok(TaskSummary { id: self.id(), kind: Self::KIND, iterations: done })
    }
}
