//! Error types for runtime access, per-target attach failures, and reload

use thiserror::Error;

/// Fatal errors: the container runtime cannot be queried at all.
///
/// Everything in this enum aborts the current run. Per-target problems
/// (a network that vanished, an attach that raced) are *not* represented
/// here - they are collected into the reconciliation report instead.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime daemon is unreachable or not responding
    #[error("container runtime unavailable: {0}")]
    Unavailable(String),

    /// A query against the runtime failed for a reason other than "not found"
    #[error("runtime {operation} failed: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },
}

/// A single attach attempt failed.
///
/// Expected under concurrent external mutation (the target network can
/// disappear between the existence check and the attach call), so this is
/// data for the report, never a reason to stop reconciling other targets.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to attach to network '{network}': {message}")]
pub struct AttachError {
    pub network: String,
    pub message: String,
}

/// Reload trigger failures.
///
/// The only per-run failure that should turn into a nonzero exit status:
/// it means the declared state was never actually made live.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// The validation command exited nonzero; reload was not attempted
    #[error("configuration validation failed (exit {status}): {output}")]
    ValidationFailed { status: i64, output: String },

    /// The reload command exited nonzero
    #[error("reload command failed (exit {status}): {output}")]
    ReloadFailed { status: i64, output: String },

    /// Could not execute the command inside the endpoint at all
    #[error("failed to exec inside endpoint: {0}")]
    Exec(String),
}
