// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Error Taxonomy
//!
//! A single error enum carries every failure mode a pipe can surface. Pipes
//! never throw arbitrary errors; they map whatever went wrong onto one of
//! these kinds so that callers can make retry/abort decisions without
//! downcasting.
//!
//! ## Propagation policy
//!
//! Synchronous pipes surface errors by failing `start`/`next`/`peek`.
//! Asynchronous pipes surface errors through the listener's `on_error`
//! callback. An async pipe that observes an upstream error propagates the
//! same kind downstream and closes itself best-effort; `close()` itself never
//! raises on top of an error path — failures while closing are logged, not
//! thrown, so they don't mask the original error.

use thiserror::Error;

/// Failure modes that can occur anywhere in a pipeline.
///
/// Each variant is a category (`§7` in the design notes), not a specific
/// cause; the payload string carries the human-readable detail.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// Underlying stream or network failure. Generally retryable at the
    /// caller's discretion.
    #[error("io error: {0}")]
    Io(String),

    /// Malformed input data (codec parse failure, corrupt frame, ...).
    /// Never retried by the core.
    #[error("validation error: {0}")]
    Validation(String),

    /// A sorted-input operator observed an out-of-order item.
    #[error("ordering error: {0}")]
    Ordering(String),

    /// An operator exceeded its configured deadline.
    #[error("timeout error: {0}")]
    Timeout(String),

    /// Excessive group size, too many open handles, too many pending tasks,
    /// quota exceeded.
    #[error("resource error: {0}")]
    Resource(String),

    /// Invariant violation — a bug, not a caller mistake.
    #[error("internal error: {0}")]
    Internal(String),

    /// Cooperative cancellation requested via `close()`.
    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl PipelineError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn ordering(msg: impl Into<String>) -> Self {
        Self::Ordering(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Whether a caller might reasonably retry the operation that produced
    /// this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::Timeout(_) | PipelineError::Resource(_) | PipelineError::Io(_))
    }

    /// Stable category tag, useful for metrics labels.
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::Io(_) => "io",
            PipelineError::Validation(_) => "validation",
            PipelineError::Ordering(_) => "ordering",
            PipelineError::Timeout(_) => "timeout",
            PipelineError::Resource(_) => "resource",
            PipelineError::Internal(_) => "internal",
            PipelineError::Cancelled(_) => "cancelled",
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Validation(err.to_string())
    }
}

/// Convenience alias used throughout the engine.
pub type PipelineResult<T> = Result<T, PipelineError>;
