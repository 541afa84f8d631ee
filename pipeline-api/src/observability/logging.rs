//! Structured logging and request correlation
//!
//! - Subscriber initialisation with JSON, pretty or compact output
//! - Request logging middleware that propagates `X-Request-ID`
//! - A `TraceLayer` span maker that records redacted URIs
//! - Redaction of continuation tokens and credentials before they reach logs
//!
//! # Examples
//!
//! ```rust,no_run
//! use pipeline_api::observability::logging::{init_logging, LogConfig};
//!
//! init_logging(LogConfig::default()).expect("Failed to initialize logging");
//! ```

use axum::{
    extract::{Request, State},
    http::{self, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Instant};
use tower_http::trace::MakeSpan;
use tracing::{info, Span};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};
use uuid::Uuid;

/// HTTP header for request correlation ID
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Patterns redacted from logged URIs and messages.
///
/// Page tokens are bearer-like: anyone holding one can resume a listing, so
/// their values are never logged.
pub const SENSITIVE_PATTERNS: &[&str] = &[
    r"(?i)(page_token=)[^&\s]+",
    r"(?i)(password\s*[:=]\s*)[^\s,&}]+",
    r"(?i)(secret\s*[:=]\s*)[^\s,&}]+",
    r"(?i)(bearer\s+)[^\s,}]+",
];

/// Log format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format for production (machine-readable)
    Json,
    /// Pretty format for development (human-readable)
    Pretty,
    /// Compact format for minimal output
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Default log level, used when `RUST_LOG` is unset
    pub level: String,
    /// Per-module log levels (e.g., "sqlx=warn,tower_http=debug")
    pub filter: Option<String>,
    /// Custom redaction patterns (regex)
    pub custom_redaction_patterns: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: "info".to_string(),
            filter: None,
            custom_redaction_patterns: Vec::new(),
        }
    }
}

/// Utility for redacting sensitive data in logs
#[derive(Debug, Clone)]
pub struct SensitiveDataRedactor {
    patterns: Vec<Regex>,
}

impl SensitiveDataRedactor {
    /// Create a new redactor with default patterns
    pub fn new() -> Self {
        Self {
            patterns: compile(SENSITIVE_PATTERNS.iter().copied()),
        }
    }

    /// Create a redactor with custom configuration
    pub fn with_config(config: &LogConfig) -> Self {
        let mut redactor = Self::new();
        redactor
            .patterns
            .extend(compile(config.custom_redaction_patterns.iter().map(String::as_str)));
        redactor
    }

    /// Redact sensitive data in a string. A leading capture group, when the
    /// pattern has one, is kept so the redacted text still shows the key.
    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        for pattern in &self.patterns {
            let replacement = if pattern.captures_len() > 1 {
                "${1}[REDACTED]"
            } else {
                "[REDACTED]"
            };
            result = pattern.replace_all(&result, replacement).into_owned();
        }

        result
    }
}

impl Default for SensitiveDataRedactor {
    fn default() -> Self {
        Self::new()
    }
}

fn compile<'a>(patterns: impl Iterator<Item = &'a str>) -> Vec<Regex> {
    patterns
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(err) => {
                tracing::warn!(pattern, error = %err, "Ignoring invalid redaction pattern");
                None
            }
        })
        .collect()
}

/// Middleware state for request logging
#[derive(Clone, Debug)]
pub struct RequestLoggingState {
    redactor: Arc<SensitiveDataRedactor>,
}

impl RequestLoggingState {
    pub fn new(config: &LogConfig) -> Self {
        Self {
            redactor: Arc::new(SensitiveDataRedactor::with_config(config)),
        }
    }
}

/// Span maker for `tower_http::trace::TraceLayer`. The default one records
/// the raw URI, page tokens included.
#[derive(Clone, Debug)]
pub struct RedactedMakeSpan {
    redactor: Arc<SensitiveDataRedactor>,
}

impl RedactedMakeSpan {
    pub fn new(config: &LogConfig) -> Self {
        Self {
            redactor: Arc::new(SensitiveDataRedactor::with_config(config)),
        }
    }
}

impl<B> MakeSpan<B> for RedactedMakeSpan {
    fn make_span(&mut self, request: &http::Request<B>) -> Span {
        tracing::debug_span!(
            "request",
            method = %request.method(),
            uri = %self.redactor.redact(&request.uri().to_string()),
            version = ?request.version(),
        )
    }
}

/// Extract or generate request ID from headers
fn extract_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Middleware for request/response logging with correlation IDs
pub async fn request_logging_middleware(
    State(state): State<RequestLoggingState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let request_id = extract_request_id(request.headers());
    let method = request.method().clone();
    let uri = state.redactor.redact(&request.uri().to_string());

    info!(
        request.method = %method,
        request.uri = %uri,
        request.id = %request_id,
        "Incoming request"
    );

    let mut response = next.run(request).await;
    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    if status.is_server_error() {
        tracing::error!(
            response.status = status.as_u16(),
            response.duration_ms = duration_ms,
            request.id = %request_id,
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            response.status = status.as_u16(),
            response.duration_ms = duration_ms,
            request.id = %request_id,
            "Request completed with client error"
        );
    } else {
        info!(
            response.status = status.as_u16(),
            response.duration_ms = duration_ms,
            request.id = %request_id,
            "Request completed successfully"
        );
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Initialize the logging system with the given configuration
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = match config.filter {
        Some(ref filter) => EnvFilter::try_new(filter)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level)),
    };

    match config.format {
        LogFormat::Json => {
            let json_layer = fmt::layer()
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .with_filter(env_filter);

            tracing_subscriber::registry().with(json_layer).try_init()?;
        }
        LogFormat::Pretty => {
            let pretty_layer = fmt::layer()
                .pretty()
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(env_filter);

            tracing_subscriber::registry().with(pretty_layer).try_init()?;
        }
        LogFormat::Compact => {
            let compact_layer = fmt::layer()
                .compact()
                .with_filter(env_filter);

            tracing_subscriber::registry().with(compact_layer).try_init()?;
        }
    }

    info!("Logging system initialized with format: {:?}", config.format);
    Ok(())
}
