//! Export archive tests
//!
//! Archives are read back with the `zip` crate to check entry names, order and
//! byte-identical contents, in both wire modes.

use std::io::{Cursor, Read};

use axum::{
    body::{Body, Bytes},
    http::{header, Request, StatusCode},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use zip::ZipArchive;

use forge_api::archive::{build_archive, EXPORT_FILENAME};
use forge_api::config::Config;
use forge_api::model::ExportFile;
use forge_api::route::create_app;
use forge_api::state::AppState;

fn setup_test_app(export_mode: &str) -> axum::Router {
    let mode = export_mode.to_string();
    let config = Config::from_lookup(move |key| (key == "EXPORT_MODE").then(|| mode.clone()));
    create_app(AppState::new(config))
}

async fn body_bytes(body: Body) -> Bytes {
    body.collect()
        .await
        .expect("Failed to read response body")
        .to_bytes()
}

async fn response_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).expect("Failed to parse JSON")
}

fn export_request(payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/exportZip")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

/// Reads every entry of an archive as `(name, contents)` in archive order
fn read_entries(bytes: &[u8]) -> Vec<(String, String)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("Invalid zip archive");
    (0..archive.len())
        .map(|index| {
            let mut entry = archive.by_index(index).unwrap();
            let mut contents = String::new();
            entry.read_to_string(&mut contents).unwrap();
            (entry.name().to_string(), contents)
        })
        .collect()
}

#[tokio::test]
async fn test_export_streams_zip_attachment() {
    let app = setup_test_app("stream");

    let payload = json!({
        "transcript": "Full transcript.\nSecond line with ünïcödé 👋",
        "tweet": "Tweet text",
        "captions": { "shorts": "Shorts caption", "linkedin": "LinkedIn caption" }
    });
    let response = app.oneshot(export_request(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/zip"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"forge_export.zip\""
    );

    let bytes = body_bytes(response.into_body()).await;
    let entries = read_entries(&bytes);

    // Fixed fields first, then custom captions sorted by key
    assert_eq!(
        entries,
        vec![
            (
                "transcript.txt".to_string(),
                "Full transcript.\nSecond line with ünïcödé 👋".to_string()
            ),
            ("tweet.txt".to_string(), "Tweet text".to_string()),
            ("linkedin.txt".to_string(), "LinkedIn caption".to_string()),
            ("shorts.txt".to_string(), "Shorts caption".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_export_keeps_free_form_caption_keys() {
    let app = setup_test_app("stream");

    let payload = json!({
        "captions": {
            "título": "Leyenda en español",
            "instagram story": "Story caption",
            "linkedin.post": "Post caption"
        }
    });
    let response = app.oneshot(export_request(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries = read_entries(&body_bytes(response.into_body()).await);
    assert_eq!(
        entries,
        vec![
            ("instagram story.txt".to_string(), "Story caption".to_string()),
            ("linkedin.post.txt".to_string(), "Post caption".to_string()),
            ("título.txt".to_string(), "Leyenda en español".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_export_all_fixed_fields() {
    let app = setup_test_app("stream");

    let payload = json!({
        "transcript": "t",
        "tweet": "tw",
        "instagram": "ig",
        "youtube": "yt"
    });
    let response = app.oneshot(export_request(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries = read_entries(&body_bytes(response.into_body()).await);
    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        ["transcript.txt", "tweet.txt", "instagram.txt", "youtube.txt"]
    );
}

#[tokio::test]
async fn test_export_skips_blank_fields() {
    let app = setup_test_app("stream");

    let payload = json!({
        "transcript": "only this",
        "youtube": "   ",
        "instagram": null,
        "captions": { "blank": "\n\t" }
    });
    let response = app.oneshot(export_request(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries = read_entries(&body_bytes(response.into_body()).await);
    assert_eq!(
        entries,
        vec![("transcript.txt".to_string(), "only this".to_string())]
    );
}

#[tokio::test]
async fn test_export_base64_mode_returns_envelope() {
    let app = setup_test_app("base64");

    let payload = json!({
        "instagram": "Insta caption",
        "captions": { "tiktok": "TikTok caption" }
    });
    let response = app.oneshot(export_request(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"]["filename"], EXPORT_FILENAME);
    assert_eq!(body["data"]["files"], json!(["instagram.txt", "tiktok.txt"]));

    let archive = STANDARD
        .decode(body["data"]["zipBase64"].as_str().unwrap())
        .unwrap();
    assert_eq!(body["data"]["size"], archive.len());
    assert_eq!(
        read_entries(&archive),
        vec![
            ("instagram.txt".to_string(), "Insta caption".to_string()),
            ("tiktok.txt".to_string(), "TikTok caption".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_export_without_content_is_rejected() {
    let app = setup_test_app("stream");

    for payload in [
        json!({}),
        json!({ "tweet": "   " }),
        json!({ "transcript": "", "captions": {} }),
    ] {
        let response = app.clone().oneshot(export_request(&payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{payload}");
        assert_ne!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/zip"
        );

        let body = response_json(response.into_body()).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["data"]["field"], "body");
    }
}

#[tokio::test]
async fn test_export_field_validation() {
    let app = setup_test_app("stream");

    let cases = [
        (json!({ "transcript": "a".repeat(50_001) }), "transcript"),
        (json!({ "tweet": "a".repeat(10_001) }), "tweet"),
        (json!({ "youtube": 12 }), "youtube"),
        (json!({ "captions": "nope" }), "captions"),
        (json!({ "captions": { "x": 5 } }), "captions.x"),
        (json!({ "captions": { "x": "a".repeat(10_001) } }), "captions.x"),
        (json!({ "captions": { "../evil": "x" } }), "captions.../evil"),
        (json!({ "captions": { "a/b": "x" } }), "captions.a/b"),
        (json!({ "tweet": "t", "captions": { "tweet": "x" } }), "captions.tweet"),
        // A per-field failure wins even when other content is present
        (json!({ "transcript": "fine", "instagram": ["x"] }), "instagram"),
    ];

    for (payload, field) in cases {
        let response = app.clone().oneshot(export_request(&payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{field}");

        let body = response_json(response.into_body()).await;
        assert_eq!(body["code"], "VALIDATION_ERROR", "{field}");
        assert_eq!(body["data"]["field"], field);
    }
}

#[tokio::test]
async fn test_export_transcript_limit_is_larger_than_social_limit() {
    let app = setup_test_app("stream");

    let payload = json!({ "transcript": "a".repeat(50_000) });
    let response = app.oneshot(export_request(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_export_requires_json_content_type() {
    let app = setup_test_app("stream");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/exportZip")
                .body(Body::from(json!({ "tweet": "x" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "INVALID_CONTENT_TYPE");
}

#[test]
fn test_build_archive_preserves_order_and_bytes() {
    let files = vec![
        ExportFile {
            name: "b.txt".to_string(),
            contents: "second?".to_string(),
        },
        ExportFile {
            name: "a.txt".to_string(),
            contents: "日本語テキスト".to_string(),
        },
    ];

    let bytes = build_archive(&files).unwrap();
    assert_eq!(
        read_entries(&bytes),
        vec![
            ("b.txt".to_string(), "second?".to_string()),
            ("a.txt".to_string(), "日本語テキスト".to_string()),
        ]
    );
}
