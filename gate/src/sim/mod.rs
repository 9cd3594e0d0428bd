use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde_derive::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::core::SharedCounter;
use crate::errors::GateError;
use crate::reader::{CounterReader, ReaderConfig};
use crate::shutdown::Shutdown;
use crate::task::{GateTask, TaskSummary};
use crate::writer::{CounterWriter, WriterConfig};

const TIMER_TICK: Duration = Duration::from_millis(10);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // Per-task access budget. Unset means loop until shutdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub initial_value: u64,
    pub reader: ReaderConfig,
    pub writer: WriterConfig,
}

impl SimConfig {
    pub fn builder() -> SimConfigBuilder {
        SimConfigBuilder { config: Default::default() }
    }

    /// Loads the config with confy, writing the defaults out if the file is missing.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<SimConfig, GateError> {
        let cfg: SimConfig = confy::load_path(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), GateError> {
        if self.reader.count == 0 && self.writer.count == 0 {
            return Err(GateError::Logic("at least one reader or writer task is required".to_string()));
        }
        if self.duration_ms == Some(0) {
            return Err(GateError::Logic("duration_ms must be greater than zero".to_string()));
        }
        Ok(())
    }
}

pub struct SimConfigBuilder {
    config: SimConfig,
}

impl SimConfigBuilder {
    pub fn readers(mut self, count: usize) -> Self {
        self.config.reader.count = count;
        self
    }

    pub fn writers(mut self, count: usize) -> Self {
        self.config.writer.count = count;
        self
    }

    pub fn read_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.reader.delay_ms = delay_ms;
        self
    }

    pub fn write_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.writer.delay_ms = delay_ms;
        self
    }

    pub fn iterations(mut self, iterations: u64) -> Self {
        self.config.iterations = Some(iterations);
        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.config.duration_ms = Some(duration_ms);
        self
    }

    pub fn initial_value(mut self, value: u64) -> Self {
        self.config.initial_value = value;
        self
    }

    pub fn build(self) -> Result<SimConfig, GateError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Exit diagnostics of a finished run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub final_value: u64,
    pub reads: u64,
    pub writes: u64,
    pub peak_concurrent_readers: usize,
    pub exclusion_violations: u64,
    pub tasks: Vec<TaskSummary>,
    pub elapsed: Duration,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "final value: {}, reads: {}, writes: {}, peak concurrent readers: {}, time: {:?}",
            self.final_value, self.reads, self.writes, self.peak_concurrent_readers, self.elapsed
        )
    }
}

// Trips the shutdown token when a task thread unwinds, so the rest of the pool stops.
struct PanicTrip {
    shutdown: Shutdown,
}

impl Drop for PanicTrip {
    fn drop(&mut self) {
        if thread::panicking() {
            self.shutdown.trigger();
        }
    }
}

type TaskHandle = (String, JoinHandle<Result<TaskSummary, GateError>>);

fn spawn_task<T>(mut task: T, iterations: Option<u64>) -> Result<TaskHandle, GateError>
    where T: GateTask + Send + 'static,
{
    let name = task.name();
    let handle = thread::Builder::new().name(name.clone()).spawn(move || {
        let shutdown = task.shutdown().clone();
        let _trip = PanicTrip { shutdown: shutdown.clone() };
        let result = task.run(iterations);
        if let Err(e) = &result {
            error!(task = %task.name(), error = %e, "task failed, stopping the pool");
            shutdown.trigger();
        }
        result
    })?;
    Ok((name, handle))
}

pub struct Simulation {
    config: SimConfig,
    gate: Arc<SharedCounter>,
    shutdown: Shutdown,
}

impl Simulation {
    pub fn new(config: SimConfig, shutdown: Shutdown) -> Result<Simulation, GateError> {
        config.validate()?;
        let gate = Arc::new(SharedCounter::new(config.initial_value));
        Ok(Simulation { config, gate, shutdown })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn gate(&self) -> &Arc<SharedCounter> {
        &self.gate
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    fn spawn_timer(&self, finished: Arc<AtomicBool>) -> Result<Option<JoinHandle<()>>, GateError> {
        let duration = match self.config.duration_ms {
            Some(ms) => Duration::from_millis(ms),
            None => return Ok(None),
        };
        let shutdown = self.shutdown.clone();
        let handle = thread::Builder::new().name("run-timer".to_string()).spawn(move || {
            let deadline = Instant::now() + duration;
            while !finished.load(Ordering::SeqCst) && !shutdown.is_triggered() {
                let now = Instant::now();
                if now >= deadline {
                    debug!(?duration, "run duration elapsed");
                    shutdown.trigger();
                    break;
                }
                thread::sleep(std::cmp::min(TIMER_TICK, deadline - now));
            }
        })?;
        Ok(Some(handle))
    }

    /// Spawns the reader and writer pool, waits for every task and reports.
    ///
    /// Tasks stop when their iteration budget runs out, when the run duration
    /// elapses or when the shutdown token fires. A failing or panicking task
    /// stops the whole pool and its error is returned once all tasks are joined.
    pub fn run(&self) -> Result<RunReport, GateError> {
        let start = Instant::now();
        let iterations = self.config.iterations;
        info!(
            readers = self.config.reader.count,
            writers = self.config.writer.count,
            ?iterations,
            duration_ms = ?self.config.duration_ms,
            "starting tasks"
        );

        let mut handles = Vec::with_capacity(self.config.reader.count + self.config.writer.count);
        if let Err(e) = self.spawn_pool(&mut handles, iterations) {
            // Stop and join whatever was already started before reporting the spawn failure.
            self.shutdown.trigger();
            let _ = join_all(handles);
            return Err(e);
        }

        let finished = Arc::new(AtomicBool::new(false));
        let timer = match self.spawn_timer(finished.clone()) {
            Ok(timer) => timer,
            Err(e) => {
                self.shutdown.trigger();
                let _ = join_all(handles);
                return Err(e);
            }
        };

        let (tasks, mut failure) = join_all(handles);
        finished.store(true, Ordering::SeqCst);
        if let Some(timer) = timer {
            if timer.join().is_err() {
                failure.get_or_insert(GateError::TaskPanicked("run-timer".to_string()));
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }

        let stats = self.gate.stats().snapshot();
        let report = RunReport {
            final_value: self.gate.read(|v| *v)?,
            reads: stats.reads,
            writes: stats.writes,
            peak_concurrent_readers: stats.peak_readers_inside,
            exclusion_violations: stats.exclusion_violations,
            tasks: tasks,
            elapsed: start.elapsed(),
        };
        info!(
            final_value = report.final_value,
            reads = report.reads,
            writes = report.writes,
            peak_concurrent_readers = report.peak_concurrent_readers,
            "all tasks joined"
        );
        Ok(report)
    }

    fn spawn_pool(&self, handles: &mut Vec<TaskHandle>, iterations: Option<u64>) -> Result<(), GateError> {
        for id in 0..self.config.reader.count {
            let reader = CounterReader::new(id, self.gate.clone(), &self.config.reader, self.shutdown.clone());
            handles.push(spawn_task(reader, iterations)?);
        }
        for id in 0..self.config.writer.count {
            let writer = CounterWriter::new(id, self.gate.clone(), &self.config.writer, self.shutdown.clone());
            handles.push(spawn_task(writer, iterations)?);
        }
        Ok(())
    }
}

/// Joins every handle. Returns the summaries of the tasks that finished cleanly
/// and the first failure, if any.
fn join_all(handles: Vec<TaskHandle>) -> (Vec<TaskSummary>, Option<GateError>) {
    let mut tasks = Vec::with_capacity(handles.len());
    let mut failure = None;
    for (name, handle) in handles {
        match handle.join() {
            Ok(Ok(summary)) => tasks.push(summary),
            Ok(Err(e)) => {
                failure.get_or_insert(e);
            }
            Err(_) => {
                error!(task = %name, "task panicked");
                failure.get_or_insert(GateError::TaskPanicked(name));
            }
        }
    }
    (tasks, failure)
}
