//! Test fixtures for shared error codes and envelopes.

use cloud_log_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Return a list of common error codes used in tests.
pub fn common_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::invalid_input(),
        ErrorCode::not_found(),
        ErrorCode::permission_denied(),
        ErrorCode::timeout(),
        ErrorCode::io(),
        ErrorCode::internal(),
    ]
}

/// An invalid input error fixture.
pub fn invalid_input_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::invalid_input(), "invalid input")
}

/// A retriable timeout error fixture.
pub fn timeout_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(ErrorCode::timeout(), "timeout", ErrorClass::Retriable)
}

/// A non-retriable delivery failure, as a rejected credential produces.
pub fn delivery_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(
        ErrorCode::new("client", "unauthorized"),
        "cloud logging rejected the credentials",
    )
    .with_metadata("status", "401")
}
