// src/execution_id.rs

//! Identifiers used by a single execution.
//!
//! - `ExecutionId` correlates logs and events for one request. It is never
//!   sent to the backend.
//! - `UnitName` names the ephemeral function. It is short, lowercase and
//!   random; uniqueness is probabilistic and collisions are not detected.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default length of a generated unit name.
pub const DEFAULT_NAME_LENGTH: usize = 16;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionId(pub String);

impl ExecutionId {
    pub fn new() -> Self {
        Self(format!("exec_{}", Uuid::new_v4()))
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of an ephemeral unit on the provisioning backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitName(String);

impl UnitName {
    /// Generate `length` lowercase letters from a non-cryptographic RNG.
    ///
    /// Not a security boundary.
    pub fn generate(length: usize) -> Self {
        let mut rng = rand::rng();
        let name = (0..length)
            .map(|_| LETTERS[rng.random_range(0..LETTERS.len())] as char)
            .collect();

        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
