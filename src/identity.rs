// src/identity.rs

//! Resolves the role a new unit runs under.
//!
//! The host reuses its own role: it describes its own unit on the backend
//! (name taken from config or the environment) and hands that role to the
//! unit it is about to create. Nothing is cached; every request resolves
//! again.

use crate::backend::ProvisioningBackend;
use crate::config::{IdentityConfig, RetryConfig};
use crate::error::IdentityError;
use crate::retry::with_retry;

use std::fmt;
use std::sync::Arc;

/// Opaque role reference attached to a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionIdentity(pub String);

impl ExecutionIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct IdentityResolver {
    backend: Arc<dyn ProvisioningBackend>,
    config: IdentityConfig,
    retry: RetryConfig,
}

impl IdentityResolver {
    pub fn new(
        backend: Arc<dyn ProvisioningBackend>,
        config: IdentityConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            backend,
            config,
            retry,
        }
    }

    fn self_name(&self) -> Result<String, IdentityError> {
        if let Some(name) = &self.config.self_name {
            return Ok(name.clone());
        }

        std::env::var(&self.config.self_name_env)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| IdentityError::MissingSelfName(self.config.self_name_env.clone()))
    }

    pub async fn resolve(&self) -> Result<ExecutionIdentity, IdentityError> {
        let name = self.self_name()?;
        tracing::debug!(host = %name, "resolving execution role from host unit");

        let description = with_retry(&self.retry, "describe host unit", || {
            self.backend.describe_unit(&name)
        })
        .await
        .map_err(|source| IdentityError::Describe {
            name: name.clone(),
            source,
        })?;

        let role = description
            .role
            .filter(|r| !r.is_empty())
            .ok_or(IdentityError::MissingRole(name))?;

        tracing::debug!(%role, "execution role resolved");
        Ok(ExecutionIdentity(role))
    }
}
