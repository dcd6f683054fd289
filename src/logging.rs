use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "PSRP_REMOTE_LOG";

/// Install a stderr subscriber filtered by `PSRP_REMOTE_LOG` (default `warn`).
/// Stdout is reserved for the module's JSON result.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
