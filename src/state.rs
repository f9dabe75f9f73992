//! Shared application state
//!
//! Everything a handler needs is reachable from `AppState`. The generators and
//! the log sink are trait objects so tests (or a future real backend) can swap
//! them without touching handler code.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::generator::{CaptionGenerator, MockCaptionGenerator, MockTranscriber, Transcriber};
use crate::logsink::{LogSink, StdoutSink};
use crate::ratelimit::{RateLimitStore, RateLimiter};

/// Application state shared across all request handlers
///
/// Cheap to clone: every member is behind an `Arc` (or is `Copy`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Captured once at boot, drives `uptime_seconds`
    pub started_at: Instant,
    pub rate_limiter: RateLimiter,
    pub transcriber: Arc<dyn Transcriber>,
    pub captioner: Arc<dyn CaptionGenerator>,
    pub log_sink: Arc<dyn LogSink>,
}

impl AppState {
    /// State with the mock generators, stdout log sink and in-memory rate limiter
    pub fn new(config: Config) -> Self {
        Self {
            rate_limiter: RateLimiter::new(config.rate_limit),
            config: Arc::new(config),
            started_at: Instant::now(),
            transcriber: Arc::new(MockTranscriber),
            captioner: Arc::new(MockCaptionGenerator),
            log_sink: Arc::new(StdoutSink),
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = transcriber;
        self
    }

    pub fn with_captioner(mut self, captioner: Arc<dyn CaptionGenerator>) -> Self {
        self.captioner = captioner;
        self
    }

    pub fn with_log_sink(mut self, log_sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = log_sink;
        self
    }

    pub fn with_rate_limit_store(mut self, store: Arc<dyn RateLimitStore>) -> Self {
        self.rate_limiter = RateLimiter::with_store(self.config.rate_limit, store);
        self
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
