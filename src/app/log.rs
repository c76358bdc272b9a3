use tracing_subscriber::EnvFilter;

/// Initialize log output
///
/// `RUST_LOG` takes precedence, otherwise `default_level` is used as the filter.
/// Must be called once at program startup (before using logs)
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber may already be installed (tests); keep the existing one
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}
