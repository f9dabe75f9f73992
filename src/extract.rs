//! Request extraction
//!
//! Custom extractors that turn raw requests into inputs for the validators,
//! reporting failures through the envelope instead of axum's plain-text
//! rejections.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        ConnectInfo, FromRequest, Request,
    },
    http::{header, HeaderMap, StatusCode},
};
use serde_json::{json, Value};

use crate::envelope::{ApiError, ErrorCode};
use crate::model::UploadedFile;

/// Content type assumed for multipart parts that do not declare one
const DEFAULT_PART_CONTENT_TYPE: &str = "text/plain";

/// Slot the error middleware places on each request so the buffered JSON body
/// can be logged if the request ends in a 500
#[derive(Debug, Clone, Default)]
pub struct CapturedBody(Arc<OnceLock<Bytes>>);

impl CapturedBody {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self, bytes: Bytes) {
        // First write wins; a body is only ever buffered once.
        let _ = self.0.set(bytes);
    }

    pub fn get(&self) -> Option<&Bytes> {
        self.0.get()
    }
}

/// JSON body as an untyped value
///
/// Enforces the `application/json` content type before reading anything, then
/// parses. Typed checks are left to the `validation` module so that the order
/// of rules (and which error wins) stays under our control.
#[derive(Debug, Clone)]
pub struct JsonBody(pub Value);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_json_content_type(req.headers()) {
            return Err(ApiError::invalid_content_type("application/json"));
        }

        let captured = req.extensions().get::<CapturedBody>().cloned();

        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::payload_too_large()
            } else {
                ApiError::invalid_json(rejection.body_text())
            }
        })?;

        if let Some(captured) = captured {
            captured.store(bytes.clone());
        }

        let value = serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::invalid_json(err.to_string()))?;
        Ok(Self(value))
    }
}

/// `application/json` or any `application/*+json`
pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .map(|mime| {
            mime.type_() == mime::APPLICATION
                && (mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON))
        })
        .unwrap_or(false)
}

/// Identifies the calling client for rate limiting and error logs
///
/// Peer address when the server was started with connect info, otherwise the
/// first `X-Forwarded-For` hop, otherwise `"unknown"`.
pub fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Reads the part named `field_name` from a multipart upload
///
/// Returns `Ok(None)` when the form has no such part; the caller decides
/// whether that is an error.
pub async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
    field_name: &str,
) -> Result<Option<UploadedFile>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        ApiError::invalid_content_type("multipart/form-data").with_detail(rejection.body_text())
    })?;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(field_name) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field
            .content_type()
            .unwrap_or(DEFAULT_PART_CONTENT_TYPE)
            .to_string();
        // Only the size is needed, so chunks are counted and dropped
        let mut size = 0u64;
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            size += chunk.len() as u64;
        }

        return Ok(Some(UploadedFile {
            original_name,
            size,
            mime_type,
        }));
    }

    Ok(None)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large();
    }
    ApiError::bad_request(ErrorCode::ValidationError, "Malformed multipart body")
        .with_data(json!({ "field": "file" }))
        .with_detail(err.body_text())
}
