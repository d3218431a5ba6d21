use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::TellerConfig;

/// Logs go to stderr so that stdout only carries the report.
/// `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &TellerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_ansi(false);
        registry.with(layer).init();
    } else {
        let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
        registry.with(layer).init();
    }
}
