use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use signal_hook::consts::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{info, warn};

use crate::errors::GateError;

/// Cancellation flag shared by every task of a run.
///
/// Tasks look at it at the top of each iteration, between the end of their
/// sleep and the next lock acquisition.
#[derive(Clone, Default, Debug)]
pub struct Shutdown {
    closing: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Shutdown {
        Default::default()
    }

    pub fn trigger(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.closing.load(Ordering::Relaxed)
    }

    /// Triggers this token on SIGHUP, SIGINT, SIGQUIT or SIGTERM.
    pub fn listen_for_signals(&self) -> Result<(), GateError> {
        let mut signals = Signals::new(&[SIGHUP, SIGINT, SIGQUIT, SIGTERM])
            .map_err(GateError::SignalHook)?;
        let closing = self.clone();
        thread::Builder::new()
            .name("signal-listener".to_string())
            .spawn(move || {
                for signal in signals.forever() {
                    if closing.is_triggered() {
                        warn!(signal, "signal received while already stopping");
                    } else {
                        info!(signal, "signal received, stopping tasks");
                    }
                    // wait for the tasks to reach the top of their loop.
                    closing.trigger();
                }
            })?;
        Ok(())
    }
}
