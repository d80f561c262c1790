//! # Pipeline Common
//!
//! This crate provides the shared abstractions used by the playback pipeline.
//! It defines the push-style `Processor<I, O>` contract that remuxers implement,
//! the common error type, and the context object that carries the stream name
//! and runtime statistics across components.
//!
//! ## Features
//!
//! - `Processor<I, O>` trait with explicit `process`/`finish` pairing
//! - Shared `StreamerContext` with lock-protected `Statistics`
//! - `init_test_tracing!` macro for tests
//!
//! ## License
//!
//! MIT License
//!
//! ## Authors
//!
//! - hua0512
//!

use thiserror::Error;

pub mod context;
pub mod processor;
pub mod test_utils;

/// Re-export key traits and types
pub use context::{Statistics, StreamerContext};
pub use processor::Processor;

pub use test_utils::create_test_context;

/// Common error type for pipeline operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Output closed")]
    OutputClosed,
}
