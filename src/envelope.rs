//! Uniform response envelope
//!
//! Every API response is exactly one of two shapes:
//!
//! ```json
//! { "ok": true,  "data": { ... }, "message": "...", "code": "..." }
//! { "ok": false, "message": "...", "code": "VALIDATION_ERROR", "data": { ... } }
//! ```
//!
//! Optional members are omitted rather than serialized as `null`. Handlers return
//! `Result<ApiResponse<T>, ApiError>`, so a handler can only ever produce one of them.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Stable machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InvalidContentType,
    InvalidJson,
    PayloadTooLarge,
    MissingFile,
    InvalidFileType,
    EmptyFile,
    InvalidTs,
    InvalidLevel,
    InvalidEvent,
    InvalidUserAnonId,
    InvalidPayload,
    FieldTooLong,
    RateLimitExceeded,
    EndpointNotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidContentType => "INVALID_CONTENT_TYPE",
            Self::InvalidJson => "INVALID_JSON",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::MissingFile => "MISSING_FILE",
            Self::InvalidFileType => "INVALID_FILE_TYPE",
            Self::EmptyFile => "EMPTY_FILE",
            Self::InvalidTs => "INVALID_TS",
            Self::InvalidLevel => "INVALID_LEVEL",
            Self::InvalidEvent => "INVALID_EVENT",
            Self::InvalidUserAnonId => "INVALID_USER_ANON_ID",
            Self::InvalidPayload => "INVALID_PAYLOAD",
            Self::FieldTooLong => "FIELD_TOO_LONG",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::EndpointNotFound => "ENDPOINT_NOT_FOUND",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire representation shared by both outcomes
#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

/// Successful outcome, always rendered with HTTP 200
///
/// Handlers that need another status write the response themselves
/// (the ZIP download is the only one that does).
#[derive(Debug)]
pub struct ApiResponse<T = Value> {
    data: Option<T>,
    message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success carrying a payload
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            message: None,
        }
    }
}

impl ApiResponse<Value> {
    /// Success without a payload, just a human-readable note
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            data: None,
            message: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let envelope = Envelope {
            ok: true,
            code: None,
            message: self.message.as_deref(),
            data: self.data.as_ref(),
            retry_after: None,
        };
        (StatusCode::OK, Json(envelope)).into_response()
    }
}

/// Internal diagnostic attached to 5xx responses
///
/// Never serialized by `ApiError` itself. The error middleware reads it from the
/// response extensions to log it, and re-renders it into the body in development.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Failed outcome
///
/// Defaults to HTTP 400 with no code; the constructors below cover every
/// failure the service reports.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    status: StatusCode,
    code: Option<ErrorCode>,
    message: String,
    data: Option<Value>,
    retry_after: Option<u64>,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: None,
            message: message.into(),
            data: None,
            retry_after: None,
            detail: None,
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// 400 with an explicit code
    pub fn bad_request(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(message).with_code(code)
    }

    pub fn invalid_content_type(expected: &str) -> Self {
        Self::bad_request(
            ErrorCode::InvalidContentType,
            format!("Content-Type must be {expected}"),
        )
    }

    pub fn invalid_json(detail: impl Into<String>) -> Self {
        Self::bad_request(ErrorCode::InvalidJson, "Request body is not valid JSON")
            .with_detail(detail)
    }

    pub fn payload_too_large() -> Self {
        Self::new("Request body exceeds the allowed size")
            .with_code(ErrorCode::PayloadTooLarge)
            .with_status(StatusCode::PAYLOAD_TOO_LARGE)
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        let mut error = Self::new("Too many requests, please try again later")
            .with_code(ErrorCode::RateLimitExceeded)
            .with_status(StatusCode::TOO_MANY_REQUESTS);
        error.retry_after = Some(retry_after);
        error
    }

    pub fn endpoint_not_found(method: &str, path: &str) -> Self {
        Self::new(format!("Endpoint {method} {path} not found"))
            .with_code(ErrorCode::EndpointNotFound)
            .with_status(StatusCode::NOT_FOUND)
            .with_data(json!({ "method": method, "path": path }))
    }

    /// 500 with a redacted message; `detail` only goes to the logs (and to the
    /// body in development)
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new("Internal server error")
            .with_code(ErrorCode::InternalError)
            .with_status(StatusCode::INTERNAL_SERVER_ERROR)
            .with_detail(detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = Envelope {
            ok: false,
            code: self.code,
            message: Some(self.message.as_str()),
            data: self.data.as_ref(),
            retry_after: self.retry_after,
        };
        let mut response = (self.status, Json(envelope)).into_response();

        if let Some(seconds) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        if let Some(detail) = self.detail {
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err.to_string())
    }
}
