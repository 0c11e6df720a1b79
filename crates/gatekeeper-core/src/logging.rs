/// Initialize `tracing` the way every binary in this workspace does:
/// `RUST_LOG`-driven env filter, falling back to a sane per-binary default.
pub fn init(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
