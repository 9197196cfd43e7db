// tracing subscriber setup shared by the binary and the tests
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when RUST_LOG is not set
fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("{}={level},sdjwt_harness={level}", env!("CARGO_CRATE_NAME")).into()
    })
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_tracing(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(default_filter(level))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Subscriber for tests, writing through the test harness capture
pub fn init_test_tracing() {
    let _ = tracing_subscriber::registry()
        .with(default_filter("debug"))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
