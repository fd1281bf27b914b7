//! Node-level error type.

use thiserror::Error;

/// Errors a node can raise outside its normal `NodeResult` return path —
/// reserved for conditions the engine must treat specially during retry.
#[derive(Debug, Error, Clone)]
pub enum NodeError {
    /// Transient failure; the engine should re-try the job.
    #[error("retryable node error: {0}")]
    Retryable(String),

    /// Permanent failure; no retry should be attempted.
    #[error("fatal node error: {0}")]
    Fatal(String),

    /// The executor rejected its own params before doing any work.
    #[error("node validation error: {0}")]
    Validation(String),
}
