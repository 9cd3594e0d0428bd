use std::{fmt, io};

#[derive(Debug)]
pub enum GateError {
    // A gate mutex was poisoned by a panicking holder. Fatal: the protocol cannot
    // vouch for the reader count anymore.
    PoisonedLock,
    TaskPanicked(String),
    Io(io::Error),
    SignalHook(io::Error), // signal_hook reports registration failures as io::Error
    Config(confy::ConfyError),
    Logic(String),
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::PoisonedLock => write!(f, "Gate lock was poisoned"),
            GateError::TaskPanicked(name) => write!(f, "Task {} panicked", name),
            GateError::Io(e) => write!(f, "IO error: {}", e),
            GateError::SignalHook(e) => write!(f, "Signal handling error: {}", e),
            GateError::Config(e) => write!(f, "Configuration error: {}", e),
            GateError::Logic(s) => write!(f, "Logic error: {}", s),
        }
    }
}

impl std::error::Error for GateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GateError::PoisonedLock => None,
            GateError::TaskPanicked(_) => None,
            GateError::Io(e) => Some(e),
            GateError::SignalHook(e) => Some(e),
            GateError::Config(e) => Some(e),
            GateError::Logic(_) => None,
        }
    }
}

impl From<io::Error> for GateError {
    fn from(err: io::Error) -> Self {
        GateError::Io(err)
    }
}

impl From<confy::ConfyError> for GateError {
    fn from(err: confy::ConfyError) -> Self {
        GateError::Config(err)
    }
}

// std::sync::Mutex and Condvar both hand back PoisonError wrapping the guard.
impl<T> From<std::sync::PoisonError<T>> for GateError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        GateError::PoisonedLock
    }
}
