// src/config.rs

use crate::engine::ExecutionMode;
use crate::execution_id::DEFAULT_NAME_LENGTH;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

/// Root configuration loaded from `config.yaml`.
///
/// This file controls:
/// - Whether snippets are executed or echoed back
/// - Where the HTTP server listens
/// - Which provisioning backend to talk to, with deadlines and retries
/// - How ephemeral units are defined
/// - How the host's own identity is discovered
///
/// Every section is optional; an empty file is a valid config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mode: ExecutionMode,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub unit: UnitConfig,

    #[serde(default)]
    pub identity: IdentityConfig,
}

/// HTTP server section.
///
/// Example:
///
/// server:
///   addr: 0.0.0.0:8080
///   powered_by: "Sadness, mostly"
///   api_key_env: LAMBDARUN_API_KEY
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Value of the `X-Powered-By` marker header.
    #[serde(default = "default_powered_by")]
    pub powered_by: String,

    /// Env var holding the API key. When the variable is set, requests must
    /// carry `Authorization: Bearer <key>`.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            powered_by: default_powered_by(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_powered_by() -> String {
    "Sadness, mostly".to_string()
}

fn default_api_key_env() -> String {
    "LAMBDARUN_API_KEY".to_string()
}

/// Provisioning backend section.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the Lambda-compatible API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Env var holding an optional bearer token for the backend.
    #[serde(default)]
    pub token_env: Option<String>,

    /// Deadline for creating a unit, in milliseconds.
    #[serde(default = "default_create_timeout_ms")]
    pub create_timeout_ms: u64,

    /// Deadline for the single invocation, in milliseconds.
    #[serde(default = "default_invoke_timeout_ms")]
    pub invoke_timeout_ms: u64,

    /// Retry policy for create and describe. Invocations are never retried.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token_env: None,
            create_timeout_ms: default_create_timeout_ms(),
            invoke_timeout_ms: default_invoke_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

impl BackendConfig {
    pub fn create_timeout(&self) -> Duration {
        Duration::from_millis(self.create_timeout_ms)
    }

    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_millis(self.invoke_timeout_ms)
    }
}

fn default_endpoint() -> String {
    "http://localhost:4566".to_string()
}

fn default_create_timeout_ms() -> u64 {
    30_000
}

fn default_invoke_timeout_ms() -> u64 {
    60_000
}

/// Bounded retries with exponential backoff.
///
/// retry:
///   max_attempts: 3
///   backoff_ms: 250
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first. 1 means no retry.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles after each failure.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryConfig {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

fn default_max_attempts() -> u32 {
    1
}

fn default_backoff_ms() -> u64 {
    250
}

/// Definition of every ephemeral unit.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitConfig {
    #[serde(default = "default_runtime")]
    pub runtime: String,

    #[serde(default = "default_description")]
    pub description: String,

    /// Length of generated unit names.
    #[serde(default = "default_identifier_length")]
    pub identifier_length: usize,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            description: default_description(),
            identifier_length: default_identifier_length(),
        }
    }
}

fn default_runtime() -> String {
    "python3.8".to_string()
}

fn default_description() -> String {
    "Invoke the provided codez".to_string()
}

fn default_identifier_length() -> usize {
    DEFAULT_NAME_LENGTH
}

/// How the host finds its own role.
///
/// identity:
///   self_name_env: AWS_LAMBDA_FUNCTION_NAME
///   # self_name: my-host-function
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_self_name_env")]
    pub self_name_env: String,

    /// Fixed host unit name. Wins over `self_name_env` when set.
    #[serde(default)]
    pub self_name: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            self_name_env: default_self_name_env(),
            self_name: None,
        }
    }
}

fn default_self_name_env() -> String {
    "AWS_LAMBDA_FUNCTION_NAME".to_string()
}

impl Config {
    /// Load and parse `config.yaml` from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::parse(&raw)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!("{:?} not found, using default configuration", path);
            Ok(Self::default())
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        // serde_yaml rejects an empty document for a struct
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let cfg: Config = serde_yaml::from_str(raw).context("Failed to parse YAML config")?;
        Ok(cfg)
    }
}
