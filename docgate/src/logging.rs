use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Builds the filter directives used when `RUST_LOG` is not set.
///
/// `level` applies to everything; the connection-level chatter of `hyper` and the
/// MongoDB driver is held at `warn`.
pub fn default_directives(level: &str) -> String {
    format!("{level},hyper=warn,hyper_util=warn,mongodb=warn")
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `LOG_LEVEL` (default `info`) is used.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
        EnvFilter::new(default_directives(&level))
    });

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(true)
        .with_line_number(true)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .init();
}
