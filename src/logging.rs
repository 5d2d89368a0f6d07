use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber filtered by `RUST_LOG`, or by `warn`
/// when it is unset.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init() -> bool {
    init_with_default("warn")
}

/// Like [`init`], with `level` as the directive used when `RUST_LOG` is unset.
pub fn init_with_default(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
