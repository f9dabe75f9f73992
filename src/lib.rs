//! Library exports for the Forge API server
//!
//! A small HTTP API with mock transcription, mock caption generation, ZIP export
//! and a structured client-log sink. The interesting part is the shared request
//! contract: every endpoint validates its input the same way and answers with the
//! same `{ ok, code, message, data }` envelope.

pub mod archive;
pub mod config;
pub mod envelope;
pub mod extract;
pub mod generator;
pub mod handler;
pub mod logsink;
pub mod middleware;
pub mod model;
pub mod ratelimit;
pub mod route;
pub mod state;
pub mod validation;
