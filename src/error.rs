/// Error Handling Module
///
/// Layered error types:
/// 1. Domain errors (`TokenError`, `StoreError`, `ValidationError`)
/// 2. Auth protocol errors (`AuthError`), keeping lookups and writes apart
/// 3. HTTP errors (`ApiError`) rendered as `{code, message}` with the cause logged

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

pub use crate::validators::ValidationError;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Token construction, parsing and validation failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Wrong segment count, empty segment or unusable Authorization header
    Malformed(&'static str),
    /// A segment is not valid base64 / UTF-8
    Decode(String),
    SignatureMismatch,
    ProtocolMismatch,
    Expired,
    /// Unparsable or degenerate (all-zero) payload
    InvalidPayload(String),
    /// Serialising a header or payload failed
    Encode(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed(reason) => write!(f, "malformed token: {}", reason),
            TokenError::Decode(msg) => write!(f, "token segment decode failed: {}", msg),
            TokenError::SignatureMismatch => write!(f, "token signature mismatch"),
            TokenError::ProtocolMismatch => write!(f, "token protocol mismatch"),
            TokenError::Expired => write!(f, "token has expired"),
            TokenError::InvalidPayload(msg) => write!(f, "invalid payload: {}", msg),
            TokenError::Encode(msg) => write!(f, "token encoding failed: {}", msg),
        }
    }
}

impl StdError for TokenError {}

/// Persistence failures. "Not found" is kept apart from everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound,
    UniqueViolation(String),
    Storage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "record not found"),
            StoreError::UniqueViolation(msg) => write!(f, "duplicate entry: {}", msg),
            StoreError::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl StdError for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                StoreError::UniqueViolation(db_err.message().to_string())
            }
            other => {
                let error_msg = other.to_string();
                if error_msg.contains("duplicate key") || error_msg.contains("unique constraint") {
                    StoreError::UniqueViolation(error_msg)
                } else {
                    StoreError::Storage(error_msg)
                }
            }
        }
    }
}

/// ============================================================================
/// 2. AUTH PROTOCOL ERRORS
/// ============================================================================

/// Failure of an auth protocol operation.
///
/// `Lookup` and `Persist` wrap the same `StoreError` but let each endpoint
/// map reads and writes to different status codes.
#[derive(Debug)]
pub enum AuthError {
    Validation(ValidationError),
    Token(TokenError),
    Lookup(StoreError),
    Persist(StoreError),
    Forbidden,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Validation(e) => write!(f, "{}", e),
            AuthError::Token(e) => write!(f, "{}", e),
            AuthError::Lookup(e) => write!(f, "lookup failed: {}", e),
            AuthError::Persist(e) => write!(f, "write failed: {}", e),
            AuthError::Forbidden => write!(f, "admin role required"),
        }
    }
}

impl StdError for AuthError {}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        AuthError::Validation(err)
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::Token(err)
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Body of every error response, and of the plain `OK` acknowledgements.
#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            code: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }

    pub fn success() -> Self {
        Self::new(StatusCode::OK)
    }
}

/// Client-facing error. The string is the internal cause: it is logged and
/// never echoed back.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
}

impl ApiError {
    pub fn bad_request(cause: impl fmt::Display) -> Self {
        ApiError::BadRequest(cause.to_string())
    }

    pub fn unauthorized(cause: impl fmt::Display) -> Self {
        ApiError::Unauthorized(cause.to_string())
    }

    pub fn not_found(cause: impl fmt::Display) -> Self {
        ApiError::NotFound(cause.to_string())
    }

    fn cause(&self) -> &str {
        match self {
            ApiError::BadRequest(cause)
            | ApiError::Unauthorized(cause)
            | ApiError::NotFound(cause) => cause,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.status_code(), self.cause())
    }
}

impl StdError for ApiError {}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        tracing::warn!(status = status.as_u16(), error = %self.cause(), "Request rejected");

        HttpResponse::build(status).json(ErrorResponse::new(status))
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-operation context for correlating log lines of one request.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub operation: &'static str,
}

impl ErrorContext {
    pub fn new(operation: &'static str) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            operation,
        }
    }

    pub fn log_error(&self, error: &AuthError) {
        match error {
            AuthError::Lookup(StoreError::Storage(_)) | AuthError::Persist(StoreError::Storage(_)) => {
                tracing::error!(
                    request_id = %self.request_id,
                    operation = self.operation,
                    error = %error,
                    "Storage failure"
                );
            }
            _ => {
                tracing::warn!(
                    request_id = %self.request_id,
                    operation = self.operation,
                    error = %error,
                    "Auth operation rejected"
                );
            }
        }
    }

    /// Log the failure of `result`, if any, and pass it through
    pub fn finish<T>(&self, result: Result<T, AuthError>) -> Result<T, AuthError> {
        if let Err(error) = &result {
            self.log_error(error);
        }
        result
    }
}
