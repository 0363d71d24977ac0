use crate::backend::ProvisioningBackend;
use crate::config::Config;
use crate::engine::lifecycle::PendingDeletes;

use serde::Serialize;
use std::sync::Arc;

pub mod events;
pub mod lifecycle;
pub mod mode;
pub mod run;
pub mod sink;
pub mod summary;
pub mod validate;

pub use mode::ExecutionMode;
pub use run::run_execution;
pub use validate::validate_config;

/* ---------------- shared execution context ---------------- */

/// Process-wide, read-only context shared by every request.
///
/// Holds no per-request state: each execution gets its own name, artifact,
/// role and unit.
#[derive(Clone)]
pub struct Engine {
    pub backend: Arc<dyn ProvisioningBackend>,
    pub config: Arc<Config>,
    pub pending: PendingDeletes,
}

impl Engine {
    pub fn new(backend: Arc<dyn ProvisioningBackend>, config: Config) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            pending: PendingDeletes::default(),
        }
    }
}

/* ---------------- validation ---------------- */

#[derive(Debug, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Serialize)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn push_error(&mut self, code: &'static str, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            code,
            message: message.into(),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.valid && self.errors.is_empty()
    }

    #[cfg(test)]
    pub fn codes(&self) -> Vec<&'static str> {
        self.errors.iter().map(|e| e.code).collect()
    }
}
