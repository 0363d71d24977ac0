// src/error.rs

//! Error taxonomy for the execution pipeline.
//!
//! Every failure in preparation or in the unit lifecycle is returned to the
//! caller as one of these values. Nothing here aborts the process.

use crate::execution_id::UnitName;
use std::time::Duration;

/// Failure talking to the provisioning backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend response could not be decoded: {0}")]
    Decode(String),

    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure building the deployable archive.
#[derive(Debug, thiserror::Error)]
pub enum PackagingError {
    #[error("failed to write archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to write archive member: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure resolving the role the new unit runs under.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("host unit name is not set (expected env var {0})")]
    MissingSelfName(String),

    #[error("could not describe host unit {name}: {source}")]
    Describe {
        name: String,
        #[source]
        source: BackendError,
    },

    #[error("host unit {0} has no role attached")]
    MissingRole(String),
}

/// Any failure of one execution, after the source has been extracted.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("packaging failed: {0}")]
    Packaging(#[from] PackagingError),

    #[error("identity resolution failed: {0}")]
    IdentityResolution(#[from] IdentityError),

    #[error("could not create unit {name}: {source}")]
    Creation {
        name: UnitName,
        #[source]
        source: BackendError,
    },

    #[error("could not invoke unit {name}: {source}")]
    Invocation {
        name: UnitName,
        #[source]
        source: BackendError,
    },

    #[error("preparation task failed: {0}")]
    Task(String),
}

impl ExecutionError {
    /// Short machine-readable code, used in events and logs.
    pub fn code(&self) -> &'static str {
        match self {
            ExecutionError::Packaging(_) => "PACKAGING_FAILED",
            ExecutionError::IdentityResolution(_) => "IDENTITY_RESOLUTION_FAILED",
            ExecutionError::Creation { .. } => "CREATION_FAILED",
            ExecutionError::Invocation { .. } => "INVOCATION_FAILED",
            ExecutionError::Task(_) => "TASK_FAILED",
        }
    }
}
