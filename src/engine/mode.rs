use serde::{Deserialize, Serialize};

/// What to do with an incoming snippet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Hand the snippet straight back. Nothing is provisioned.
    Echo,
    /// Package, provision, invoke once and tear down.
    #[default]
    Execute,
}

impl ExecutionMode {
    /// Whether this mode touches the provisioning backend at all.
    pub fn provisions(self) -> bool {
        matches!(self, ExecutionMode::Execute)
    }
}
