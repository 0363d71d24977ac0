use crate::execution_id::{ExecutionId, UnitName};
use crate::metrics::StageTimings;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ExecutionSummary {
    pub execution_id: ExecutionId,
    pub status: ExecutionStatus,

    /// Name of the unit that ran the snippet. `None` when echoed.
    pub unit: Option<UnitName>,

    /// Response body: the echoed source or the raw invocation payload.
    #[serde(skip)]
    pub body: Vec<u8>,

    pub function_error: Option<String>,
    pub timings: StageTimings,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Echoed,
    Executed,
}

impl ExecutionSummary {
    pub fn echoed(execution_id: ExecutionId, source: String) -> Self {
        Self {
            execution_id,
            status: ExecutionStatus::Echoed,
            unit: None,
            body: source.into_bytes(),
            function_error: None,
            timings: StageTimings::default(),
        }
    }

    pub fn executed(
        execution_id: ExecutionId,
        unit: UnitName,
        result: crate::backend::InvocationResult,
        timings: StageTimings,
    ) -> Self {
        Self {
            execution_id,
            status: ExecutionStatus::Executed,
            unit: Some(unit),
            body: result.payload,
            function_error: result.function_error,
            timings,
        }
    }

    #[cfg(test)]
    pub fn body_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
