// ============================================================================
// Utilities Module
// Logging bootstrap for binaries, demos and benchmarks
// ============================================================================

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG`.
///
/// Falls back to `unitfield=info` when `RUST_LOG` is unset or invalid.
/// Safe to call more than once; later calls leave the first subscriber in
/// place and return `false`.
#[cfg(feature = "logging")]
pub fn init_logging() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("unitfield=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// No-op without the `logging` feature; the library only emits events.
#[cfg(not(feature = "logging"))]
pub fn init_logging() -> bool {
    false
}
