//! Centralized logging initialization with environment variable support

use crate::{LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing subscriber with environment variable support
///
/// Environment variables (in priority order):
/// - `RUST_LOG`: Standard Rust log filter (takes precedence over all)
/// - `LOG_FORMAT`: Override format (json, pretty)
///
/// # Examples
///
/// ```bash
/// # Module-specific filtering
/// RUST_LOG=mill_action_engine=debug cargo test
///
/// # Structured logs
/// LOG_FORMAT=json ./host
/// ```
///
/// Does nothing if a global subscriber is already installed.
pub fn initialize(config: &LoggingConfig) {
    let log_level = config.level.parse().unwrap_or(tracing::Level::INFO);

    // RUST_LOG takes precedence over config
    let env_filter = EnvFilter::from_default_env().add_directive(log_level.into());

    let format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|f| match f.to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" | "human" => Some(LogFormat::Pretty),
            _ => None,
        })
        .unwrap_or_else(|| config.format.clone());

    // Always write to stderr; stdout belongs to the host protocol
    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}

/// Create a request span with standard fields for context propagation
///
/// Every provider span created while the request runs nests under it, so
/// provider logs carry the document and execution mode.
///
/// # Example
///
/// ```rust
/// use mill_action_config::logging::request_span;
///
/// let span = request_span("src/main.rs", "rust", "standard");
/// let _enter = span.enter();
/// tracing::info!("Collecting code actions");
/// ```
pub fn request_span(document: &str, language: &str, mode: &str) -> tracing::Span {
    tracing::info_span!(
        "code_actions",
        document = %document,
        language = %language,
        mode = %mode
    )
}

/// Span for a single provider invocation
pub fn provider_span(provider: &str) -> tracing::Span {
    tracing::debug_span!("provider", provider = %provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_twice_is_harmless() {
        let config = LoggingConfig::default();
        initialize(&config);
        initialize(&config);
    }

    #[test]
    fn test_spans_can_be_entered() {
        let span = request_span("src/lib.rs", "rust", "interactive");
        let _enter = span.enter();
        let provider = provider_span("fixer");
        let _inner = provider.enter();
    }
}
