//! Observability for the API server: structured logging, request
//! correlation IDs and redaction of sensitive request data.

pub mod logging;

pub use logging::{
    init_logging, request_logging_middleware, LogConfig, LogFormat, RedactedMakeSpan,
    RequestLoggingState, SensitiveDataRedactor, REQUEST_ID_HEADER, SENSITIVE_PATTERNS,
};
