use tracing_subscriber::EnvFilter;

/// Installs a stderr `tracing` subscriber filtered by `RESULT_SINK_LOG`, then
/// `RUST_LOG`, then `warn`. Stdout is left for the summary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("RESULT_SINK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}
