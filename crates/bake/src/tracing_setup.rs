use std::sync::Once;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Sets up a terminal-only tracing subscriber, filtering the chattiest
/// wgpu/naga internals down to warnings. Idempotent so tests and repeated
/// CLI invocations within one process never double-init.
fn setup_logging_hooks() {
    let level_filter = if std::env::var_os("LMBAKE_VERBOSE").is_some() {
        LevelFilter::TRACE
    } else {
        LevelFilter::DEBUG
    };

    let env_filter = EnvFilter::new("debug,naga=warn,wgpu_hal=warn,wgpu_core::device::global=warn");

    tracing_subscriber::registry()
        .with(level_filter)
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn ensure_logging_hooks() {
    static ONCE: Once = Once::new();
    ONCE.call_once(setup_logging_hooks);
}
