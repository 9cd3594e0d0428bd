use std::{
    error::Error,
    sync::{mpsc, Arc, Barrier},
    thread,
    time::Duration,
};

use super::init_tracing;
use crate::{
    reader::{CounterReader, ReaderConfig},
    task::{GateTask, TaskKind, TaskState},
    writer::{CounterWriter, WriterConfig},
    GateError, SharedCounter, Shutdown, SimConfig, Simulation,
};

const ITERATIONS: u64 = 10;

// 1 writer and 3 readers, 10 accesses each, no delay.
fn small_pool() -> Result<SimConfig, GateError> {
    SimConfig::builder()
        .readers(3)
        .writers(1)
        .read_delay_ms(0)
        .write_delay_ms(0)
        .iterations(ITERATIONS)
        .build()
}

#[test]
fn test_small_pool_counts_every_write() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let report = Simulation::new(small_pool()?, Shutdown::new())?.run()?;

    assert_eq!(report.final_value, 10);
    assert_eq!(report.writes, 10);
    assert_eq!(report.reads, 30);
    assert_eq!(report.exclusion_violations, 0);
    assert!(report.peak_concurrent_readers >= 1 && report.peak_concurrent_readers <= 3);
    assert_eq!(report.tasks.len(), 4);
    assert!(report.tasks.iter().all(|t| t.iterations == ITERATIONS));
    assert_eq!(report.tasks.iter().filter(|t| t.kind == TaskKind::Writer).count(), 1);
    Ok(())
}

#[test]
fn test_small_pool_reader_observations() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cfg = small_pool()?;
    let gate = Arc::new(SharedCounter::new(0));
    let shutdown = Shutdown::new();
    // The first access of every reader waits here, inside the read step, for the others.
    let first_read = Arc::new(Barrier::new(cfg.reader.count));

    let readers: Vec<_> = (0..cfg.reader.count)
        .map(|id| {
            let mut reader = CounterReader::new(id, gate.clone(), &cfg.reader, shutdown.clone());
            let gate = gate.clone();
            let first_read = first_read.clone();
            thread::spawn(move || -> Result<Vec<u64>, GateError> {
                let mut seen = vec![gate.read(|v| {
                    first_read.wait();
                    *v
                })?];
                for _ in 1..ITERATIONS {
                    seen.push(reader.read_once()?);
                }
                Ok(seen)
            })
        })
        .collect();
    let writer = {
        let mut writer = CounterWriter::new(0, gate.clone(), &cfg.writer, shutdown.clone());
        thread::spawn(move || writer.run(Some(ITERATIONS)))
    };

    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let seen: Vec<_> = readers.into_iter().map(|r| r.join().unwrap()).collect();
        let _ = done_tx.send(seen);
    });
    let seen = done_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("readers did not finish, the cohort never formed");
    let summary = writer.join().unwrap()?;

    assert_eq!(summary.iterations, ITERATIONS);
    assert_eq!(gate.read(|v| *v)?, 10);
    for values in seen {
        let values = values?;
        assert_eq!(values.len() as u64, ITERATIONS);
        assert!(values.iter().all(|v| *v <= 10));
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }
    assert!(gate.stats().snapshot().peak_readers_inside >= 3);
    Ok(())
}

#[test]
fn test_bounded_pool_terminates() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cfg = SimConfig::builder()
        .readers(5)
        .writers(2)
        .read_delay_ms(1)
        .write_delay_ms(1)
        .iterations(20)
        .build()?;

    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let result = Simulation::new(cfg, Shutdown::new()).and_then(|sim| sim.run());
        let _ = done_tx.send(result);
    });
    let report = done_rx
        .recv_timeout(Duration::from_secs(30))
        .expect("simulation did not terminate")?;

    assert_eq!(report.final_value, 40);
    assert_eq!(report.reads, 100);
    assert_eq!(report.exclusion_violations, 0);
    Ok(())
}

#[test]
fn test_tasks_end_in_stopped_state() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let gate = Arc::new(SharedCounter::new(0));
    let shutdown = Shutdown::new();
    let mut reader = CounterReader::new(0, gate.clone(), &ReaderConfig { count: 1, delay_ms: 0 }, shutdown.clone());
    let mut writer = CounterWriter::new(0, gate.clone(), &WriterConfig { count: 1, delay_ms: 0 }, shutdown.clone());

    writer.run(Some(3))?;
    reader.run(Some(3))?;
    assert_eq!(writer.state(), TaskState::Stopped);
    assert_eq!(reader.state(), TaskState::Stopped);

    shutdown.trigger();
    assert_eq!(writer.run(None)?.iterations, 0);
    assert_eq!(gate.read(|v| *v)?, 3);
    Ok(())
}
