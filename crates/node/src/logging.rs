use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "info";

/// Installs a global subscriber that prints log and tracing events to
/// stderr, filtered by the `RUST_LOG` environment variable.
///
/// Calling this more than once, or after another subscriber was installed,
/// has no effect.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_error| EnvFilter::new(DEFAULT_DIRECTIVE));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(error) = result {
        log::debug!("Logging was already initialized: {error}");
    }
}
