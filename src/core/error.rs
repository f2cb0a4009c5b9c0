//! Error types shared by the launch core

use thiserror::Error;

/// Why the single-instance lock could not be taken
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// Another live instance holds the lock
    #[error("another instance is already running")]
    Busy,
    /// A previous instance died while holding the lock
    #[error("instance lock is held by another instance, but seems abandoned")]
    Abandoned,
    /// The OS refused to create or wait on the lock
    #[error("failed to create instance lock: {0}")]
    Os(String),
}

/// Why a process could not be inspected
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InspectError {
    #[error("access denied while inspecting process {0}")]
    AccessDenied(u32),
    #[error("process {0} has exited")]
    Exited(u32),
}
