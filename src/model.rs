//! Data models for the API
//!
//! Validated request types (what handlers consume after validation) and the
//! `data` payloads placed inside success envelopes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caption tone, picks which fixed template family is used
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Default,
    Professional,
    Casual,
    Funny,
}

impl Tone {
    /// Accepted wire values, in documentation order
    pub const VALUES: &'static [&'static str] = &["default", "professional", "casual", "funny"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::Default),
            "professional" => Some(Self::Professional),
            "casual" => Some(Self::Casual),
            "funny" => Some(Self::Funny),
            _ => None,
        }
    }
}

/// Validated body of `POST /api/captions`
#[derive(Debug, Clone)]
pub struct CaptionRequest {
    pub transcript: String,
    pub tone: Tone,
    pub max_len: u32,
}

/// The three generated social captions
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Captions {
    pub tweet: String,
    pub instagram: String,
    pub youtube: String,
}

#[derive(Serialize, Debug)]
pub struct CaptionsData {
    pub captions: Captions,
}

/// A file received through `POST /api/transcribe`
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub size: u64,
    pub mime_type: String,
}

/// Result produced by a `Transcriber`
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    pub language: String,
}

/// Metadata echo of the uploaded file
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub original_name: String,
    pub size: u64,
    pub mime_type: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeData {
    pub mock: bool,
    pub language: String,
    pub text: String,
    pub file_info: FileInfo,
}

/// One text file of an export archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// Entry name inside the archive, e.g. `tweet.txt`
    pub name: String,
    pub contents: String,
}

/// Validated body of `POST /api/exportZip`, files already in archive order
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub files: Vec<ExportFile>,
}

/// `data` of the export response when the deployment uses base64 mode
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub filename: String,
    pub files: Vec<String>,
    pub size: usize,
    pub zip_base64: String,
}

/// Severity accepted by the client log sink
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const VALUES: &'static [&'static str] = &["debug", "info", "warn", "error"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Validated client log record, serialized verbatim as one NDJSON line
///
/// # Example
/// ```json
/// {"ts":"2024-05-01T12:00:00Z","level":"info","event":"export_clicked","userAnonId":"a1b2","payload":{}}
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Timestamp exactly as the client sent it
    pub ts: String,
    pub level: LogLevel,
    pub event: String,
    pub user_anon_id: String,
    pub payload: Map<String, Value>,
}

#[derive(Serialize, Debug)]
pub struct HealthData {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LogLevelData {
    pub log_level: String,
}
