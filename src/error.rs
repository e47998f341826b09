//! Internal error type.
//!
//! Everything that is not itself a verdict — a failed `fork`, a `ptrace`
//! call that returned `ESRCH` for an unexpected reason, a malformed
//! manifest — flows through here as a `Result<T, SandboxError>`. The
//! driver (`driver.rs`) is the single place that turns one of these into
//! an `IE` or `EE` `CaseResult`.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SandboxError>;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Errno(#[from] nix::Error),

    #[error("{path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("{flag} argument error")]
    InvalidArgument { flag: &'static str },

    #[error("{what}: {reason}")]
    Fatal { what: &'static str, reason: String },
}

impl SandboxError {
    pub fn fatal(what: &'static str, reason: impl std::fmt::Display) -> Self {
        SandboxError::Fatal {
            what,
            reason: reason.to_string(),
        }
    }
}
