//! Request validation
//!
//! Validators take the raw JSON body (or the extracted upload) and either return a
//! normalized, defaulted request type or the first rule that failed. Rules for a
//! string field always run in the same order:
//!
//! 1. presence and type
//! 2. blank check (whitespace-only)
//! 3. length bounds (counted in characters)
//! 4. enum membership
//!
//! Validation is fail-fast: the first violation is the only one reported.

use std::ffi::OsStr;
use std::ops::RangeInclusive;
use std::path::Path;

use chrono::DateTime;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::envelope::{ApiError, ErrorCode};
use crate::model::{
    CaptionRequest, ExportFile, ExportRequest, LogLevel, LogRecord, Tone, UploadedFile,
};

/// Captions: transcript length limit
pub const TRANSCRIPT_MAX_CHARS: usize = 10_000;
/// Captions: accepted `maxLen` values
pub const MAX_LEN_RANGE: RangeInclusive<i64> = 10..=500;
/// Captions: `maxLen` when omitted
pub const DEFAULT_MAX_LEN: u32 = 120;

/// Export: transcript length limit
pub const EXPORT_TRANSCRIPT_MAX_CHARS: usize = 50_000;
/// Export: limit for tweet/instagram/youtube and every custom caption
pub const EXPORT_TEXT_MAX_CHARS: usize = 10_000;
/// Export: limit for custom caption keys
pub const CAPTION_KEY_MAX_CHARS: usize = 100;
/// Export: named fields that map to fixed archive entries, in archive order
pub const EXPORT_FIELDS: [(&str, usize); 4] = [
    ("transcript", EXPORT_TRANSCRIPT_MAX_CHARS),
    ("tweet", EXPORT_TEXT_MAX_CHARS),
    ("instagram", EXPORT_TEXT_MAX_CHARS),
    ("youtube", EXPORT_TEXT_MAX_CHARS),
];

/// Log sink: limit for `event` and `userAnonId`
pub const LOG_FIELD_MAX_CHARS: usize = 100;

/// Upload: extensions accepted regardless of the declared MIME type
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp3", "wav", "mp4", "mov", "avi", "mkv", "m4a", "aac"];
/// Upload: MIME prefixes accepted regardless of the file extension
pub const ALLOWED_MIME_PREFIXES: &[&str] = &["audio/", "video/", "application/octet-stream"];

/// A rejected request, carrying the path of the first failing field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub code: ErrorCode,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(code: ErrorCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.code, err.message).with_data(json!({ "field": err.field }))
    }
}

/// String field rule, checked in the fixed order described in the module docs
#[derive(Debug, Clone)]
pub struct StringRule {
    field: &'static str,
    non_blank: bool,
    max_chars: Option<usize>,
    allowed: Option<&'static [&'static str]>,
    invalid_code: ErrorCode,
    too_long_code: ErrorCode,
}

impl StringRule {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            non_blank: false,
            max_chars: None,
            allowed: None,
            invalid_code: ErrorCode::ValidationError,
            too_long_code: ErrorCode::ValidationError,
        }
    }

    pub fn non_blank(mut self) -> Self {
        self.non_blank = true;
        self
    }

    pub fn max_chars(mut self, max: usize) -> Self {
        self.max_chars = Some(max);
        self
    }

    pub fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.allowed = Some(values);
        self
    }

    /// Codes reported for type/blank/enum failures and for length failures
    pub fn codes(mut self, invalid: ErrorCode, too_long: ErrorCode) -> Self {
        self.invalid_code = invalid;
        self.too_long_code = too_long;
        self
    }

    /// Field may be absent (or `null`)
    pub fn optional<'v>(&self, body: &'v Map<String, Value>) -> Result<Option<&'v str>, ValidationError> {
        self.check_value(self.field, present(body, self.field))
    }

    /// Field must be present
    pub fn required<'v>(&self, body: &'v Map<String, Value>) -> Result<&'v str, ValidationError> {
        self.optional(body)?.ok_or_else(|| {
            ValidationError::new(
                self.invalid_code,
                self.field,
                format!("{} is required", self.field),
            )
        })
    }

    /// Runs the rule against a value found under `path`
    pub fn check_value<'v>(
        &self,
        path: &str,
        value: Option<&'v Value>,
    ) -> Result<Option<&'v str>, ValidationError> {
        let text = match value {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(text)) => text.as_str(),
            Some(_) => {
                return Err(ValidationError::new(
                    self.invalid_code,
                    path,
                    format!("{path} must be a string"),
                ))
            }
        };

        if self.non_blank && text.trim().is_empty() {
            return Err(ValidationError::new(
                self.invalid_code,
                path,
                format!("{path} must not be empty or whitespace"),
            ));
        }

        if let Some(max) = self.max_chars {
            if text.chars().count() > max {
                return Err(ValidationError::new(
                    self.too_long_code,
                    path,
                    format!("{path} must be at most {max} characters"),
                ));
            }
        }

        if let Some(allowed) = self.allowed {
            if !allowed.contains(&text) {
                return Err(ValidationError::new(
                    self.invalid_code,
                    path,
                    format!("{path} must be one of: {}", allowed.join(", ")),
                ));
            }
        }

        Ok(Some(text))
    }
}

/// Looks up a field, treating JSON `null` as absent
fn present<'v>(body: &'v Map<String, Value>, field: &str) -> Option<&'v Value> {
    body.get(field).filter(|value| !value.is_null())
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationError> {
    body.as_object().ok_or_else(|| {
        ValidationError::new(
            ErrorCode::ValidationError,
            "body",
            "Request body must be a JSON object",
        )
    })
}

/// Integer field; numeric strings are rejected, integral floats such as `50.0` pass
fn optional_integer(
    body: &Map<String, Value>,
    field: &str,
    range: RangeInclusive<i64>,
) -> Result<Option<i64>, ValidationError> {
    let number = match present(body, field) {
        None => return Ok(None),
        Some(Value::Number(number)) => number,
        Some(_) => {
            return Err(ValidationError::new(
                ErrorCode::ValidationError,
                field,
                format!("{field} must be a number"),
            ))
        }
    };

    let integer = number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|value| value.fract() == 0.0)
            .map(|value| value as i64)
    });

    match integer {
        Some(value) if range.contains(&value) => Ok(Some(value)),
        Some(_) => Err(ValidationError::new(
            ErrorCode::ValidationError,
            field,
            format!(
                "{field} must be between {} and {}",
                range.start(),
                range.end()
            ),
        )),
        None => Err(ValidationError::new(
            ErrorCode::ValidationError,
            field,
            format!("{field} must be an integer"),
        )),
    }
}

/// Validates `POST /api/captions`
///
/// ```json
/// { "transcript": "hello world", "tone": "professional", "maxLen": 50 }
/// ```
pub fn validate_captions(body: &Value) -> Result<CaptionRequest, ValidationError> {
    let body = as_object(body)?;

    let transcript = StringRule::new("transcript")
        .non_blank()
        .max_chars(TRANSCRIPT_MAX_CHARS)
        .required(body)?;

    let tone = StringRule::new("tone")
        .one_of(Tone::VALUES)
        .optional(body)?
        .and_then(Tone::from_name)
        .unwrap_or_default();

    let max_len = optional_integer(body, "maxLen", MAX_LEN_RANGE)?
        .map(|value| value as u32)
        .unwrap_or(DEFAULT_MAX_LEN);

    Ok(CaptionRequest {
        transcript: transcript.to_string(),
        tone,
        max_len,
    })
}

/// Validates `POST /api/exportZip` and lays out the archive entries
///
/// Per-field checks run first for every field that is present; only then is the
/// "at least one non-empty field" rule applied. Whitespace-only text contributes
/// no file.
pub fn validate_export(body: &Value) -> Result<ExportRequest, ValidationError> {
    let body = as_object(body)?;
    let mut files = Vec::new();

    for (field, max) in EXPORT_FIELDS {
        let text = StringRule::new(field).max_chars(max).optional(body)?;
        if let Some(text) = text.filter(|text| !text.trim().is_empty()) {
            files.push(ExportFile {
                name: format!("{field}.txt"),
                contents: text.to_string(),
            });
        }
    }

    if let Some(captions) = present(body, "captions") {
        let captions = captions.as_object().ok_or_else(|| {
            ValidationError::new(
                ErrorCode::ValidationError,
                "captions",
                "captions must be an object of strings",
            )
        })?;

        // Sorted so archive layout never depends on client key order
        let mut keys: Vec<&String> = captions.keys().collect();
        keys.sort();

        let rule = StringRule::new("captions").max_chars(EXPORT_TEXT_MAX_CHARS);
        for key in keys {
            let path = format!("captions.{key}");
            validate_caption_key(key, &path)?;

            let text = rule.check_value(&path, captions.get(key))?;
            if let Some(text) = text.filter(|text| !text.trim().is_empty()) {
                let name = format!("{key}.txt");
                // Keys are unique, so a clash can only be with a fixed field
                if files.iter().any(|file| file.name == name) {
                    return Err(ValidationError::new(
                        ErrorCode::ValidationError,
                        path,
                        format!("caption key '{key}' clashes with the {key} field"),
                    ));
                }
                files.push(ExportFile {
                    name,
                    contents: text.to_string(),
                });
            }
        }
    }

    if files.is_empty() {
        return Err(ValidationError::new(
            ErrorCode::ValidationError,
            "body",
            "At least one of transcript, tweet, instagram, youtube or captions must be non-empty",
        ));
    }

    Ok(ExportRequest { files })
}

/// Caption keys become archive entry names, so they must not be able to
/// escape the archive root
fn validate_caption_key(key: &str, path: &str) -> Result<(), ValidationError> {
    let path_safe = !key.is_empty()
        && key.chars().count() <= CAPTION_KEY_MAX_CHARS
        && !key.contains("..")
        && !key.chars().any(|c| c == '/' || c == '\\' || c.is_control());
    if !path_safe {
        return Err(ValidationError::new(
            ErrorCode::ValidationError,
            path,
            format!(
                "caption keys must be 1-{CAPTION_KEY_MAX_CHARS} characters without '/', '\\', '..' or control characters"
            ),
        ));
    }

    Ok(())
}

/// Validates `POST /api/log`
///
/// Legacy clients may send `name` instead of `event` and `meta` instead of
/// `payload`; the record is always emitted under the canonical keys.
pub fn validate_log(body: &Value) -> Result<LogRecord, ValidationError> {
    let body = as_object(body)?;

    let ts = StringRule::new("ts")
        .non_blank()
        .codes(ErrorCode::InvalidTs, ErrorCode::InvalidTs)
        .required(body)?;
    if DateTime::parse_from_rfc3339(ts).is_err() {
        return Err(ValidationError::new(
            ErrorCode::InvalidTs,
            "ts",
            "ts must be an ISO-8601 timestamp",
        ));
    }

    let level_name = StringRule::new("level")
        .one_of(LogLevel::VALUES)
        .codes(ErrorCode::InvalidLevel, ErrorCode::InvalidLevel)
        .required(body)?;
    let level = LogLevel::from_name(level_name).ok_or_else(|| {
        ValidationError::new(ErrorCode::InvalidLevel, "level", "level is not recognized")
    })?;

    let event_field = if present(body, "event").is_none() && present(body, "name").is_some() {
        "name"
    } else {
        "event"
    };
    let event = StringRule::new(event_field)
        .non_blank()
        .max_chars(LOG_FIELD_MAX_CHARS)
        .codes(ErrorCode::InvalidEvent, ErrorCode::FieldTooLong)
        .required(body)?;

    let user_anon_id = StringRule::new("userAnonId")
        .non_blank()
        .max_chars(LOG_FIELD_MAX_CHARS)
        .codes(ErrorCode::InvalidUserAnonId, ErrorCode::FieldTooLong)
        .required(body)?;

    let payload_field = if present(body, "payload").is_none() && present(body, "meta").is_some() {
        "meta"
    } else {
        "payload"
    };
    let payload = match present(body, payload_field) {
        None => Map::new(),
        Some(Value::Object(payload)) => payload.clone(),
        Some(_) => {
            return Err(ValidationError::new(
                ErrorCode::InvalidPayload,
                payload_field,
                format!("{payload_field} must be an object"),
            ))
        }
    };

    Ok(LogRecord {
        ts: ts.to_string(),
        level,
        event: event.to_string(),
        user_anon_id: user_anon_id.to_string(),
        payload,
    })
}

/// Validates an upload for `POST /api/transcribe`
///
/// The size check always runs first; a file then passes the type check through
/// either its extension or its MIME type.
pub fn validate_upload(file: Option<UploadedFile>) -> Result<UploadedFile, ValidationError> {
    let file = file.ok_or_else(|| {
        ValidationError::new(
            ErrorCode::MissingFile,
            "file",
            "No file uploaded, send the media in the `file` field",
        )
    })?;

    if file.size == 0 {
        return Err(ValidationError::new(
            ErrorCode::EmptyFile,
            "file",
            "Uploaded file is empty",
        ));
    }

    if !is_allowed_media(&file.original_name, &file.mime_type) {
        return Err(ValidationError::new(
            ErrorCode::InvalidFileType,
            "file",
            format!(
                "Unsupported file type, expected one of: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ),
        ));
    }

    Ok(file)
}

/// Extension allow-list OR MIME prefix allow-list
pub fn is_allowed_media(file_name: &str, mime_type: &str) -> bool {
    let extension_ok = Path::new(file_name)
        .extension()
        .and_then(OsStr::to_str)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    let mime = mime_type.trim().to_ascii_lowercase();
    let mime_ok = ALLOWED_MIME_PREFIXES
        .iter()
        .any(|prefix| mime.starts_with(prefix));

    extension_ok || mime_ok
}
