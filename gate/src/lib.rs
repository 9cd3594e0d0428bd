pub mod core;
mod errors;
pub mod reader;
pub mod shutdown;
pub mod sim;
pub mod task;
pub mod writer;

#[cfg(test)]
mod tests;

pub use crate::core::{ReaderWriterGate, SharedCounter};
pub use errors::GateError;
pub use shutdown::Shutdown;
pub use sim::{RunReport, SimConfig, Simulation};
