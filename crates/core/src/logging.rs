//! Initialization functions for tracing
//!
//! Native builds log to stderr through `tracing-subscriber`; wasm builds
//! write to the browser console through `tracing-web`.

use crate::error::{CoreError, CoreResult};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Build the filter, letting `RUST_LOG` override the configured level
fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing for native targets
#[cfg(not(target_arch = "wasm32"))]
pub fn init_tracing(log_level: &str, json: bool) -> CoreResult<()> {
    let registry = tracing_subscriber::registry().with(env_filter(log_level));

    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    result.map_err(|e| CoreError::logging(e.to_string()))
}

/// Initialize tracing for the browser console
#[cfg(target_arch = "wasm32")]
pub fn init_tracing(log_level: &str, _json: bool) -> CoreResult<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(tracing_web::MakeWebConsoleWriter::new());

    tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(fmt_layer)
        .try_init()
        .map_err(|e| CoreError::logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_error() {
        // The first call may race other tests; only the second is asserted.
        let _ = init_tracing("debug", false);
        let err = init_tracing("debug", false).unwrap_err();
        assert!(matches!(err, CoreError::Logging { .. }));
    }
}
