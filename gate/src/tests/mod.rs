use std::sync::Once;

use tracing_subscriber::EnvFilter;

mod scenario_tests;

static INIT: Once = Once::new();

// RUST_LOG=rwgate=trace shows every state change of every task.
pub(crate) fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .try_init();
    });
}
