// src/engine/lifecycle.rs

//! Create → invoke → destroy for one ephemeral unit.
//!
//! ```text
//! Preparing ─► Creating ─► Invoking ─► Completed
//!                 │           │
//!                 ▼           ▼
//!               Failed      Failed
//! ```
//!
//! Once a unit exists it is destroyed exactly once, whatever happens to the
//! invocation. Destruction is a detached task: its outcome is logged and
//! never reported to the caller, and the response does not wait for it.

use crate::backend::{InvocationResult, ProvisioningBackend, UnitDefinition};
use crate::config::{BackendConfig, UnitConfig};
use crate::error::{BackendError, ExecutionError};
use crate::execution_id::UnitName;
use crate::identity::ExecutionIdentity;
use crate::packager::{ExecutionArtifact, HANDLER};
use crate::retry::with_retry;

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// A created unit. Owned by one request.
///
/// Dropping it without calling `destroy` (e.g. the request was cancelled
/// mid-invoke) still schedules the delete.
pub struct EphemeralUnit {
    name: UnitName,
    backend: Arc<dyn ProvisioningBackend>,
    armed: bool,
}

impl EphemeralUnit {
    fn new(name: UnitName, backend: Arc<dyn ProvisioningBackend>) -> Self {
        Self {
            name,
            backend,
            armed: true,
        }
    }

    pub fn name(&self) -> &UnitName {
        &self.name
    }

    /// Request deletion in the background. Best effort, outcome unobserved.
    ///
    /// The returned handle lets one-shot callers wait before exiting.
    pub fn destroy(mut self) -> Option<JoinHandle<()>> {
        self.armed = false;
        spawn_delete(Arc::clone(&self.backend), self.name.clone())
    }
}

impl Drop for EphemeralUnit {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(unit = %self.name, "unit dropped before destroy, deleting");
            spawn_delete(Arc::clone(&self.backend), self.name.clone());
        }
    }
}

fn spawn_delete(backend: Arc<dyn ProvisioningBackend>, name: UnitName) -> Option<JoinHandle<()>> {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::warn!(unit = %name, "no runtime available, unit left behind");
        return None;
    };

    Some(runtime.spawn(async move {
        match backend.delete_unit(&name).await {
            Ok(()) => tracing::debug!(unit = %name, "unit deleted"),
            Err(e) => tracing::warn!(unit = %name, error = %e, "unit delete failed (ignored)"),
        }
    }))
}

/// Detached deletes still in flight.
///
/// The server never waits on these. One-shot callers drain them before the
/// runtime shuts down so the unit is not left behind.
#[derive(Clone, Default)]
pub struct PendingDeletes(Arc<Mutex<Vec<JoinHandle<()>>>>);

impl PendingDeletes {
    pub fn track(&self, handle: JoinHandle<()>) {
        if let Ok(mut handles) = self.0.lock() {
            handles.retain(|h| !h.is_finished());
            handles.push(handle);
        }
    }

    /// Wait up to `deadline` for every tracked delete to finish.
    pub async fn drain(&self, deadline: Duration) {
        let handles = match self.0.lock() {
            Ok(mut handles) => std::mem::take(&mut *handles),
            Err(_) => return,
        };
        if handles.is_empty() {
            return;
        }

        let all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if timeout(deadline, all).await.is_err() {
            tracing::warn!("gave up waiting for unit deletes after {:?}", deadline);
        }
    }
}

/// One create attempt bounded by `deadline`.
///
/// A timed-out create may still land on the backend, so the name is handed
/// to a best-effort delete before the timeout is reported.
async fn create_within(
    backend: &Arc<dyn ProvisioningBackend>,
    definition: &UnitDefinition<'_>,
    deadline: Duration,
) -> Result<(), BackendError> {
    match timeout(deadline, backend.create_unit(definition)).await {
        Ok(created) => created,
        Err(_) => {
            tracing::warn!(unit = %definition.name, "create timed out, deleting in case it landed");
            spawn_delete(Arc::clone(backend), definition.name.clone());
            Err(BackendError::Timeout(deadline))
        }
    }
}

pub struct Lifecycle<'a> {
    backend: &'a Arc<dyn ProvisioningBackend>,
    backend_cfg: &'a BackendConfig,
    unit_cfg: &'a UnitConfig,
}

impl<'a> Lifecycle<'a> {
    pub fn new(
        backend: &'a Arc<dyn ProvisioningBackend>,
        backend_cfg: &'a BackendConfig,
        unit_cfg: &'a UnitConfig,
    ) -> Self {
        Self {
            backend,
            backend_cfg,
            unit_cfg,
        }
    }

    /// Provision a unit running `artifact` under `identity`.
    ///
    /// The first attempt uses `name`. Bounded by `create_timeout_ms` per
    /// attempt and retried per the retry policy; every retry gets a freshly
    /// generated name so it never collides with an earlier attempt that
    /// landed late. Only timed-out attempts are deleted.
    pub async fn create(
        &self,
        artifact: &ExecutionArtifact,
        name: UnitName,
        identity: &ExecutionIdentity,
    ) -> Result<EphemeralUnit, ExecutionError> {
        let deadline = self.backend_cfg.create_timeout();
        let length = name.as_str().len();

        let backend = self.backend;
        let unit_cfg = self.unit_cfg;
        let mut first = Some(name);
        let mut last: Option<UnitName> = None;

        let created = with_retry(&self.backend_cfg.retry, "create unit", || {
            let name = first.take().unwrap_or_else(|| UnitName::generate(length));
            last = Some(name.clone());
            tracing::info!(unit = %name, runtime = %unit_cfg.runtime, "creating unit");

            async move {
                let definition = UnitDefinition {
                    name: &name,
                    artifact,
                    role: identity.as_str(),
                    runtime: &unit_cfg.runtime,
                    handler: HANDLER,
                    description: &unit_cfg.description,
                };
                create_within(backend, &definition, deadline).await?;
                Ok::<_, BackendError>(name)
            }
        })
        .await;

        match created {
            Ok(name) => Ok(EphemeralUnit::new(name, Arc::clone(self.backend))),
            Err(source) => {
                let name = last.unwrap_or_else(|| UnitName::generate(length));
                tracing::error!(unit = %name, error = %source, "unit creation failed");
                Err(ExecutionError::Creation { name, source })
            }
        }
    }

    /// Run `unit` exactly once with no input and wait for its output.
    ///
    /// Bounded by `invoke_timeout_ms`. Never retried.
    pub async fn invoke(&self, unit: &EphemeralUnit) -> Result<InvocationResult, ExecutionError> {
        let deadline = self.backend_cfg.invoke_timeout();
        tracing::info!(unit = %unit.name(), "invoking unit");

        let invoked = timeout(deadline, self.backend.invoke_unit(unit.name()))
            .await
            .unwrap_or(Err(BackendError::Timeout(deadline)));

        match invoked {
            Ok(result) => {
                if let Some(kind) = &result.function_error {
                    tracing::warn!(unit = %unit.name(), function_error = %kind, "snippet raised");
                }
                Ok(result)
            }
            Err(source) => {
                tracing::error!(unit = %unit.name(), error = %source, "invocation failed");
                Err(ExecutionError::Invocation {
                    name: unit.name().clone(),
                    source,
                })
            }
        }
    }
}
