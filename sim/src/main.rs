use std::error::Error;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rwgate::{RunReport, Shutdown, SimConfig, Simulation};

#[derive(clap::Parser)]
#[clap(about = "Runs reader and writer threads against a reader-preference gate")]
struct Opts {
    #[clap(short = 'c', long = "config", default_value = "rwgate-sim.toml")]
    config: String,
    #[clap(long)]
    readers: Option<usize>,
    #[clap(long)]
    writers: Option<usize>,
    #[clap(long = "read-delay-ms")]
    read_delay_ms: Option<u64>,
    #[clap(long = "write-delay-ms")]
    write_delay_ms: Option<u64>,
    /// Accesses per task. Without it tasks loop until stopped.
    #[clap(long)]
    iterations: Option<u64>,
    /// Stops every task after this many milliseconds.
    #[clap(long = "duration-ms")]
    duration_ms: Option<u64>,
}

impl Opts {
    fn apply(&self, cfg: &mut SimConfig) {
        if let Some(readers) = self.readers {
            cfg.reader.count = readers;
        }
        if let Some(writers) = self.writers {
            cfg.writer.count = writers;
        }
        if let Some(delay_ms) = self.read_delay_ms {
            cfg.reader.delay_ms = delay_ms;
        }
        if let Some(delay_ms) = self.write_delay_ms {
            cfg.writer.delay_ms = delay_ms;
        }
        if self.iterations.is_some() {
            cfg.iterations = self.iterations;
        }
        if self.duration_ms.is_some() {
            cfg.duration_ms = self.duration_ms;
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let opts: Opts = Opts::parse();
    let mut cfg = SimConfig::load(&opts.config)?;
    opts.apply(&mut cfg);
    cfg.validate()?;
    info!(config = %opts.config, "{:?}", &cfg);

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals()?;
    match run(cfg, shutdown) {
        Ok(report) => {
            println!("{}", report);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "run aborted");
            Err(e)
        }
    }
}

fn run(cfg: SimConfig, shutdown: Shutdown) -> Result<RunReport, Box<dyn Error>> {
    let simulation = Simulation::new(cfg, shutdown)?;
    let report = simulation.run()?;
    for task in &report.tasks {
        info!(task = %task.name(), iterations = task.iterations, "task finished");
    }
    Ok(report)
}
