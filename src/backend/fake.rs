// src/backend/fake.rs

//! In-memory backend for tests. Counts every call and can be told to fail
//! at any stage.

use crate::backend::{InvocationResult, ProvisioningBackend, UnitDefinition, UnitDescription};
use crate::error::BackendError;
use crate::execution_id::UnitName;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const HOST_NAME: &str = "host-function";
pub const HOST_ROLE: &str = "arn:aws:iam::000000000000:role/host";

#[derive(Debug, Clone)]
pub struct CreatedUnit {
    pub name: String,
    pub role: String,
    pub runtime: String,
    pub handler: String,
    pub artifact: Vec<u8>,
}

#[derive(Default)]
pub struct FakeBackend {
    pub creates: AtomicUsize,
    pub invokes: AtomicUsize,
    pub deletes: AtomicUsize,
    pub describes: AtomicUsize,

    pub created: Mutex<Vec<CreatedUnit>>,
    pub deleted: Mutex<Vec<String>>,

    /// Number of leading create calls that fail.
    pub fail_creates: AtomicUsize,
    /// Number of leading create calls that record the unit, then stall for
    /// `create_delay` before answering.
    pub slow_creates: AtomicUsize,
    pub create_delay: Duration,
    pub fail_invoke: bool,
    pub fail_delete: bool,
    pub fail_describe: bool,
    pub no_role: bool,
    pub invoke_delay: Option<Duration>,
    pub describe_delay: Option<Duration>,
    pub payload: Vec<u8>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            payload: b"2".to_vec(),
            ..Default::default()
        }
    }

    pub fn with_payload(payload: &str) -> Self {
        Self {
            payload: payload.as_bytes().to_vec(),
            ..Default::default()
        }
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Wait until `n` deletes were seen; detached deletes land a little later
    /// than the response.
    pub async fn wait_for_deletes(&self, n: usize) {
        for _ in 0..200 {
            if Self::count(&self.deletes) >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub fn created_units(&self) -> Vec<CreatedUnit> {
        self.created.lock().unwrap().clone()
    }

    pub fn deleted_names(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

fn rejected(body: &str) -> BackendError {
    BackendError::Status {
        status: 500,
        body: body.to_string(),
    }
}

#[async_trait]
impl ProvisioningBackend for FakeBackend {
    async fn create_unit(&self, definition: &UnitDefinition<'_>) -> Result<(), BackendError> {
        self.creates.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fail_creates.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_creates.store(remaining - 1, Ordering::SeqCst);
            return Err(rejected("create rejected"));
        }

        {
            let mut created = self.created.lock().unwrap();
            if created.iter().any(|u| u.name == definition.name.as_str()) {
                return Err(BackendError::Status {
                    status: 409,
                    body: "ResourceConflictException".to_string(),
                });
            }
            created.push(CreatedUnit {
                name: definition.name.to_string(),
                role: definition.role.to_string(),
                runtime: definition.runtime.to_string(),
                handler: definition.handler.to_string(),
                artifact: definition.artifact.bytes.clone(),
            });
        }

        let slow = self.slow_creates.load(Ordering::SeqCst);
        if slow > 0 {
            self.slow_creates.store(slow - 1, Ordering::SeqCst);
            tokio::time::sleep(self.create_delay).await;
        }
        Ok(())
    }

    async fn invoke_unit(&self, _name: &UnitName) -> Result<InvocationResult, BackendError> {
        self.invokes.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.invoke_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_invoke {
            return Err(rejected("invoke failed"));
        }

        Ok(InvocationResult {
            status: 200,
            payload: self.payload.clone(),
            function_error: None,
        })
    }

    async fn delete_unit(&self, name: &UnitName) -> Result<(), BackendError> {
        self.deleted.lock().unwrap().push(name.to_string());
        self.deletes.fetch_add(1, Ordering::SeqCst);

        if self.fail_delete {
            return Err(rejected("delete failed"));
        }
        Ok(())
    }

    async fn describe_unit(&self, name: &str) -> Result<UnitDescription, BackendError> {
        self.describes.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.describe_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_describe {
            return Err(rejected("describe failed"));
        }
        Ok(UnitDescription {
            name: name.to_string(),
            role: (!self.no_role).then(|| HOST_ROLE.to_string()),
        })
    }
}
