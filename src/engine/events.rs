use crate::execution_id::ExecutionId;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionEventKind {
    ExecutionCreated,
    SourceEchoed,
    IdentifierGenerated { unit: String },
    ArtifactPackaged { size: usize, sha256: String },
    IdentityResolved { role: String },
    UnitCreated { unit: String },
    UnitInvoked { unit: String, status: u16, function_error: Option<String> },
    DestroyRequested { unit: String },
    ExecutionFailed { code: String, message: String },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecutionEvent {
    pub execution_id: ExecutionId,
    #[serde(flatten)]
    pub kind: ExecutionEventKind,
    pub timestamp: SystemTime,
}

impl ExecutionEvent {
    pub fn new(execution_id: &ExecutionId, kind: ExecutionEventKind) -> Self {
        Self {
            execution_id: execution_id.clone(),
            kind,
            timestamp: SystemTime::now(),
        }
    }
}
