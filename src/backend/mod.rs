// src/backend/mod.rs

//! Provisioning backend.
//!
//! The pipeline only ever talks to the backend through `ProvisioningBackend`.
//! The backend is the sole source of truth for unit existence; nothing is
//! persisted locally.

pub mod http;

#[cfg(test)]
pub mod fake;

use crate::error::BackendError;
use crate::execution_id::UnitName;
use crate::packager::ExecutionArtifact;

use async_trait::async_trait;

/// Everything needed to create one unit.
#[derive(Debug)]
pub struct UnitDefinition<'a> {
    pub name: &'a UnitName,
    pub artifact: &'a ExecutionArtifact,
    pub role: &'a str,
    pub runtime: &'a str,
    pub handler: &'a str,
    pub description: &'a str,
}

/// Raw outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// Status code reported by the backend for the invocation.
    pub status: u16,

    /// Raw payload returned by the unit.
    pub payload: Vec<u8>,

    /// Set when the code inside the unit raised. `payload` then holds the
    /// backend's error description.
    pub function_error: Option<String>,
}

/// Subset of a unit's configuration returned by `describe_unit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDescription {
    pub name: String,
    pub role: Option<String>,
}

#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    /// Create a unit from an artifact, a role and a name.
    async fn create_unit(&self, definition: &UnitDefinition<'_>) -> Result<(), BackendError>;

    /// Invoke a unit synchronously with no input payload.
    async fn invoke_unit(&self, name: &UnitName) -> Result<InvocationResult, BackendError>;

    /// Delete a unit by name.
    async fn delete_unit(&self, name: &UnitName) -> Result<(), BackendError>;

    /// Describe a unit by name. Used to find the host's own role.
    async fn describe_unit(&self, name: &str) -> Result<UnitDescription, BackendError>;
}
