//! Benchmark tests for critical operations
//!
//! Run with: cargo test --release -- --nocapture bench

use std::time::Instant;

use serde_json::json;

use forge_api::archive::build_archive;
use forge_api::generator::{CaptionGenerator, MockCaptionGenerator};
use forge_api::validation::{validate_captions, validate_export};

/// Benchmark helper to measure execution time
fn benchmark<F>(name: &str, iterations: usize, mut f: F)
where
    F: FnMut(),
{
    let start = Instant::now();

    for _ in 0..iterations {
        f();
    }

    let duration = start.elapsed();
    let avg_ms = duration.as_millis() as f64 / iterations as f64;
    let ops_per_sec = (iterations as f64 / duration.as_secs_f64()) as u64;

    println!("  {} ({} iterations)", name, iterations);
    println!("    Total time: {:?}", duration);
    println!("    Avg time: {:.3}ms", avg_ms);
    println!("    Throughput: {} ops/sec\n", ops_per_sec);
}

#[test]
#[ignore] // Run explicitly with: cargo test bench --release -- --ignored --nocapture
fn bench_captions() {
    println!("\n=== Benchmark: Captions ===\n");

    let body = json!({
        "transcript": "word ".repeat(2_000),
        "tone": "casual",
        "maxLen": 500
    });
    let generator = MockCaptionGenerator;

    benchmark("Validate + generate (10k-char transcript)", 10_000, || {
        let request = validate_captions(&body).unwrap();
        let _ = generator.generate(&request);
    });
}

#[test]
#[ignore]
fn bench_export_archive() {
    println!("\n=== Benchmark: Export archive ===\n");

    let mut captions = serde_json::Map::new();
    for index in 0..20 {
        captions.insert(format!("custom_{index}"), json!("caption text ".repeat(500)));
    }
    let body = json!({
        "transcript": "transcript text ".repeat(3_000),
        "tweet": "tweet",
        "instagram": "instagram",
        "youtube": "youtube",
        "captions": captions
    });

    let request = validate_export(&body).unwrap();
    benchmark("Build archive (24 entries)", 200, || {
        let _ = build_archive(&request.files).unwrap();
    });

    benchmark("Validate export body", 1_000, || {
        let _ = validate_export(&body).unwrap();
    });
}
