use std::fs;
use std::io;

use rwgate::{Shutdown, SimConfig, Simulation};

use tempfile::tempdir;
use tracing_subscriber::EnvFilter;

// 1 writer, 3 readers, 10 accesses each with no delay.
const SCENARIO: &str = "iterations = 10\n\
    initial_value = 0\n\
    \n\
    [reader]\n\
    count = 3\n\
    delay_ms = 0\n\
    \n\
    [writer]\n\
    count = 1\n\
    delay_ms = 0\n";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();
    println!("Starting readers-writers scenario...");

    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("scenario.toml");
    fs::write(&config_path, SCENARIO)?;

    let cfg = SimConfig::load(&config_path)?;
    println!("[Main] Loaded {:?}", cfg);

    let report = Simulation::new(cfg, Shutdown::new())?.run()?;
    println!("[Main] {}", report);

    let mut failures = Vec::new();
    if report.final_value != 10 {
        failures.push(format!("expected final value 10, got {}", report.final_value));
    }
    if report.writes != 10 {
        failures.push(format!("expected 10 writes, got {}", report.writes));
    }
    if report.reads != 30 {
        failures.push(format!("expected 30 reads, got {}", report.reads));
    }
    if report.exclusion_violations != 0 {
        failures.push(format!("{} writer/reader overlaps observed", report.exclusion_violations));
    }
    if report.peak_concurrent_readers > 3 {
        failures.push(format!("{} readers inside at once with a pool of 3", report.peak_concurrent_readers));
    }
    if report.peak_concurrent_readers < 2 {
        // With no delay the readers may simply never collide on this machine.
        println!("Warning: readers never overlapped in this run. This can happen due to timing.");
    }

    if failures.is_empty() {
        println!("\nScenario successful! Every write was counted and the gate stayed exclusive.");
        Ok(())
    } else {
        for failure in &failures {
            eprintln!("[Main] {}", failure);
        }
        eprintln!("\nScenario failed.");
        Err(Box::new(io::Error::new(io::ErrorKind::Other, "Scenario failed")))
    }
}
