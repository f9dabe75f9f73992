use axum::http::StatusCode;
use serde_json::json;

use forge_api::config::{Config, Environment, ExportMode};
use forge_api::envelope::{ApiError, ErrorCode};
use forge_api::generator::{effective_slice_len, transcript_slice};
use forge_api::model::{LogLevel, Tone, UploadedFile};
use forge_api::validation::{
    is_allowed_media, validate_captions, validate_export, validate_log, validate_upload,
};

fn upload(name: &str, mime: &str, contents: &'static [u8]) -> UploadedFile {
    UploadedFile {
        original_name: name.to_string(),
        size: contents.len() as u64,
        mime_type: mime.to_string(),
    }
}

#[test]
fn test_captions_first_failing_field_wins() {
    let err = validate_captions(&json!({ "transcript": 5, "tone": "nope", "maxLen": "x" }))
        .unwrap_err();
    assert_eq!(err.field, "transcript");

    let err = validate_captions(&json!({ "transcript": "ok", "tone": "nope", "maxLen": "x" }))
        .unwrap_err();
    assert_eq!(err.field, "tone");
    assert_eq!(err.code, ErrorCode::ValidationError);
}

#[test]
fn test_validation_error_becomes_bad_request() {
    let err = validate_log(&json!({ "ts": "yesterday" })).unwrap_err();
    let api_error = ApiError::from(err);
    assert_eq!(api_error.status(), StatusCode::BAD_REQUEST);
    assert_eq!(api_error.code(), Some(ErrorCode::InvalidTs));

    let api_error = ApiError::rate_limited(7);
    assert_eq!(api_error.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(api_error.code(), Some(ErrorCode::RateLimitExceeded));
}

#[test]
fn test_captions_blank_check_runs_before_length() {
    // Whitespace-only and over the limit: the blank rule reports first
    let err = validate_captions(&json!({ "transcript": " ".repeat(10_001) })).unwrap_err();
    assert!(err.message.contains("whitespace"), "{}", err.message);
}

#[test]
fn test_captions_defaults_and_null_fields() {
    let request =
        validate_captions(&json!({ "transcript": "hi", "tone": null, "maxLen": null })).unwrap();
    assert_eq!(request.tone, Tone::Default);
    assert_eq!(request.max_len, 120);

    let request =
        validate_captions(&json!({ "transcript": "hi", "tone": "funny", "maxLen": 10 })).unwrap();
    assert_eq!(request.tone, Tone::Funny);
    assert_eq!(request.max_len, 10);
}

#[test]
fn test_integral_float_max_len_is_accepted() {
    let request = validate_captions(&json!({ "transcript": "hi", "maxLen": 50.0 })).unwrap();
    assert_eq!(request.max_len, 50);
}

#[test]
fn test_slice_length_clamp() {
    assert_eq!(effective_slice_len(10), 20);
    assert_eq!(effective_slice_len(120), 120);
    assert_eq!(effective_slice_len(500), 180);

    let transcript = "é".repeat(300);
    assert_eq!(transcript_slice(&transcript, 500).chars().count(), 180);
    assert_eq!(transcript_slice("short", 500), "short");
}

#[test]
fn test_export_field_errors_precede_emptiness_check() {
    let err = validate_export(&json!({ "tweet": "   ", "youtube": 3 })).unwrap_err();
    assert_eq!(err.field, "youtube");

    let err = validate_export(&json!({ "tweet": "   " })).unwrap_err();
    assert_eq!(err.field, "body");
}

#[test]
fn test_export_layout_counts_every_non_empty_field() {
    let request = validate_export(&json!({
        "transcript": "t",
        "tweet": "",
        "instagram": "i",
        "captions": { "z_last": "z", "a_first": "a", "empty": "" }
    }))
    .unwrap();

    let names: Vec<&str> = request.files.iter().map(|file| file.name.as_str()).collect();
    assert_eq!(names, ["transcript.txt", "instagram.txt", "a_first.txt", "z_last.txt"]);
}

#[test]
fn test_export_rejects_bad_caption_keys() {
    for key in ["", "../up", "a/b", "a\\b", "tab\there"] {
        let mut captions = serde_json::Map::new();
        captions.insert(key.to_string(), json!("text"));
        let err = validate_export(&json!({ "captions": captions })).unwrap_err();
        assert_eq!(err.field, format!("captions.{key}"));
    }

    let long_key = "k".repeat(101);
    let mut captions = serde_json::Map::new();
    captions.insert(long_key.clone(), json!("text"));
    assert!(validate_export(&json!({ "captions": captions })).is_err());
}

#[test]
fn test_export_accepts_free_form_caption_keys() {
    let request = validate_export(&json!({
        "captions": {
            "instagram story": "a",
            "linkedin.post": "b",
            "título": "c"
        }
    }))
    .unwrap();
    let names: Vec<&str> = request.files.iter().map(|file| file.name.as_str()).collect();
    assert_eq!(names, ["instagram story.txt", "linkedin.post.txt", "título.txt"]);
}

#[test]
fn test_export_caption_key_clashes_only_with_sent_field() {
    let request = validate_export(&json!({ "captions": { "transcript": "hi" } })).unwrap();
    assert_eq!(request.files[0].name, "transcript.txt");

    // Blank fixed field contributes no file, so nothing clashes
    let request =
        validate_export(&json!({ "youtube": "  ", "captions": { "youtube": "yt" } })).unwrap();
    assert_eq!(request.files.len(), 1);

    let err = validate_export(&json!({ "youtube": "v", "captions": { "youtube": "yt" } }))
        .unwrap_err();
    assert_eq!(err.field, "captions.youtube");
    assert_eq!(err.code, ErrorCode::ValidationError);
}

#[test]
fn test_log_record_is_normalized() {
    let record = validate_log(&json!({
        "ts": "2024-05-01T12:00:00.123Z",
        "level": "debug",
        "event": "e",
        "userAnonId": "u"
    }))
    .unwrap();

    assert_eq!(record.ts, "2024-05-01T12:00:00.123Z");
    assert_eq!(record.level, LogLevel::Debug);
    assert!(record.payload.is_empty());
}

#[test]
fn test_log_checks_ts_first() {
    let err = validate_log(&json!({ "ts": "nope", "level": "nope" })).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidTs);

    let err = validate_log(&json!({ "ts": "2024-05-01T12:00:00Z", "level": "nope" })).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidLevel);
}

#[test]
fn test_log_event_exactly_at_limit_is_accepted() {
    let record = validate_log(&json!({
        "ts": "2024-05-01T12:00:00Z",
        "level": "info",
        "event": "x".repeat(100),
        "userAnonId": "u".repeat(100)
    }));
    assert!(record.is_ok());
}

#[test]
fn test_upload_size_is_checked_before_type() {
    let err = validate_upload(Some(upload("notes.txt", "text/plain", b""))).unwrap_err();
    assert_eq!(err.code, ErrorCode::EmptyFile);

    let err = validate_upload(None).unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingFile);

    let err = validate_upload(Some(upload("notes.txt", "text/plain", b"x"))).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFileType);

    assert!(validate_upload(Some(upload("talk.wav", "text/plain", b"x"))).is_ok());
}

#[test]
fn test_media_allow_lists() {
    assert!(is_allowed_media("a.mp3", ""));
    assert!(is_allowed_media("a.AAC", "text/plain"));
    assert!(is_allowed_media("a", "audio/ogg"));
    assert!(is_allowed_media("a", "Video/MP4"));
    assert!(is_allowed_media("a.dat", "application/octet-stream"));
    assert!(!is_allowed_media("a.dat", "application/pdf"));
    assert!(!is_allowed_media("mp3", "image/png"));
}

#[test]
fn test_config_defaults() {
    let config = Config::default();
    assert_eq!(config.port, 8080);
    assert_eq!(config.environment, Environment::Production);
    assert_eq!(config.export_mode, ExportMode::Stream);
    assert_eq!(config.rate_limit.max_requests, 100);
    assert_eq!(config.rate_limit.window.as_secs(), 60);
    assert_eq!(config.max_json_bytes, 5 * 1024 * 1024);
    assert_eq!(config.max_upload_bytes, 200 * 1024 * 1024);
    assert_eq!(config.bind_addr(), "0.0.0.0:8080");
}

#[test]
fn test_config_overrides_and_fallbacks() {
    let config = Config::from_lookup(|key| match key {
        "PORT" => Some("not-a-port".to_string()),
        "APP_ENV" => Some("Development".to_string()),
        "EXPORT_MODE" => Some("base64".to_string()),
        "RATE_LIMIT_MAX" => Some("60".to_string()),
        "RATE_LIMIT_WINDOW_SECS" => Some("0".to_string()),
        _ => None,
    });

    assert_eq!(config.port, 8080);
    assert_eq!(config.environment, Environment::Development);
    assert!(config.environment.exposes_error_details());
    assert_eq!(config.export_mode, ExportMode::Base64);
    assert_eq!(config.rate_limit.max_requests, 60);
    assert_eq!(config.rate_limit.window.as_secs(), 60);
}
