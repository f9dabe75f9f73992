//! HTTP request handlers
//!
//! Each handler is thin: extract, validate, call the pluggable generator (or
//! sink), and wrap the result in the envelope. Every failure path returns an
//! `ApiError`, so the response is always exactly one of success or failure.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        OriginalUri, State,
    },
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::archive::{build_archive, EXPORT_FILENAME};
use crate::config::ExportMode;
use crate::envelope::{ApiError, ApiResponse};
use crate::extract::{read_upload, JsonBody};
use crate::model::{
    CaptionsData, ExportData, FileInfo, HealthData, LogLevelData, TranscribeData,
};
use crate::state::AppState;
use crate::validation::{validate_captions, validate_export, validate_log, validate_upload};

/// Liveness probe
///
/// # Response
///
/// ```json
/// { "ok": true, "data": { "status": "ok", "version": "0.1.0", "uptime_seconds": 42 } }
/// ```
pub async fn health(State(state): State<AppState>) -> ApiResponse<HealthData> {
    ApiResponse::success(HealthData {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Diagnostic stub reporting the active tracing filter; changes nothing
pub async fn log_level(State(state): State<AppState>) -> ApiResponse<LogLevelData> {
    ApiResponse::success(LogLevelData {
        log_level: state.config.log_filter.clone(),
    })
}

/// Mock transcription of an uploaded media file
///
/// # Request
///
/// `multipart/form-data` with the media in the `file` part. Accepted when the
/// file is non-empty and either its extension (mp3, wav, mp4, mov, avi, mkv,
/// m4a, aac) or its MIME type (audio/*, video/*, application/octet-stream) is
/// allowed.
///
/// # Response
///
/// - **200 OK** - `{ mock, language, text, fileInfo }`
/// - **400 Bad Request** - `MISSING_FILE`, `EMPTY_FILE`, `INVALID_FILE_TYPE`,
///   `INVALID_CONTENT_TYPE`
pub async fn transcribe(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<TranscribeData>, ApiError> {
    let upload = read_upload(multipart, "file").await?;
    let file = validate_upload(upload).inspect_err(|err| {
        tracing::debug!(code = %err.code, message = %err.message, "upload rejected");
    })?;

    let transcript = state.transcriber.transcribe(&file);
    tracing::info!(
        file_name = %file.original_name,
        size = file.size,
        mime_type = %file.mime_type,
        "transcribed upload"
    );

    Ok(ApiResponse::success(TranscribeData {
        mock: true,
        language: transcript.language,
        text: transcript.text,
        file_info: FileInfo {
            original_name: file.original_name,
            size: file.size,
            mime_type: file.mime_type,
        },
    }))
}

/// Mock social captions from a transcript
///
/// # Request Body
///
/// ```json
/// { "transcript": "hello world", "tone": "professional", "maxLen": 50 }
/// ```
///
/// `tone` defaults to `default`, `maxLen` to 120.
pub async fn captions(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<ApiResponse<CaptionsData>, ApiError> {
    let request = validate_captions(&body).inspect_err(|err| {
        tracing::debug!(field = %err.field, message = %err.message, "captions request rejected");
    })?;

    let captions = state.captioner.generate(&request);
    Ok(ApiResponse::success(CaptionsData { captions }))
}

/// Bundles the submitted texts into `forge_export.zip`
///
/// One `<field>.txt` entry per non-empty field, plus `<key>.txt` for each
/// custom caption. Depending on `EXPORT_MODE` the archive is either the raw
/// response body or base64 inside the success envelope.
pub async fn export_zip(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Response, ApiError> {
    let request = validate_export(&body).inspect_err(|err| {
        tracing::debug!(field = %err.field, message = %err.message, "export request rejected");
    })?;

    let archive = build_archive(&request.files)?;
    let names: Vec<String> = request.files.into_iter().map(|file| file.name).collect();
    tracing::info!(entries = names.len(), bytes = archive.len(), "built export archive");

    let response = match state.config.export_mode {
        ExportMode::Stream => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{EXPORT_FILENAME}\""),
                ),
            ],
            archive,
        )
            .into_response(),
        ExportMode::Base64 => ApiResponse::success(ExportData {
            filename: EXPORT_FILENAME.to_string(),
            size: archive.len(),
            files: names,
            zip_base64: STANDARD.encode(&archive),
        })
        .into_response(),
    };

    Ok(response)
}

/// Client log sink
///
/// # Request Body
///
/// ```json
/// { "ts": "2024-05-01T12:00:00Z", "level": "info", "event": "export_clicked",
///   "userAnonId": "a1b2c3", "payload": { "files": 3 } }
/// ```
///
/// Emits the record as one NDJSON line on the blocking pool and answers with a
/// message-only success.
pub async fn log(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<ApiResponse<Value>, ApiError> {
    let record = validate_log(&body).inspect_err(|err| {
        tracing::debug!(code = %err.code, field = %err.field, "log record rejected");
    })?;

    // Sinks do blocking I/O (stdout), so keep it off the async workers
    let sink = Arc::clone(&state.log_sink);
    tokio::task::spawn_blocking(move || sink.emit(&record))
        .await
        .map_err(|err| ApiError::internal(format!("log sink task failed: {err}")))??;

    Ok(ApiResponse::message("Log recorded"))
}

/// Fallback for unknown `/api` paths and unsupported methods on known ones
pub async fn endpoint_not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::endpoint_not_found(method.as_str(), uri.path())
}
