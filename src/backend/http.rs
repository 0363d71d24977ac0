// src/backend/http.rs

//! HTTP provisioning backend speaking the Lambda REST API.
//!
//! Endpoints used (relative to `backend.endpoint`):
//! - `POST   /2015-03-31/functions`                    create
//! - `POST   /2015-03-31/functions/{name}/invocations` invoke
//! - `DELETE /2015-03-31/functions/{name}`             delete
//! - `GET    /2015-03-31/functions/{name}`             describe
//!
//! Requests are not SigV4-signed. The endpoint is expected to be a gateway
//! or emulator that accepts an optional bearer token.

use crate::backend::{InvocationResult, ProvisioningBackend, UnitDefinition, UnitDescription};
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::execution_id::UnitName;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value as JsonValue;
use std::time::Duration;

const API_VERSION: &str = "2015-03-31";
const FUNCTION_ERROR_HEADER: &str = "x-amz-function-error";
const INVOCATION_TYPE_HEADER: &str = "x-amz-invocation-type";

/// Timeout for the small control-plane calls (describe / delete).
const CONTROL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
}

impl HttpBackend {
    /// Build a client for `cfg.endpoint`, reading the optional token from
    /// the environment variable named by `cfg.token_env`.
    pub fn from_config(cfg: &BackendConfig) -> Result<Self> {
        let token = cfg
            .token_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok());

        Self::new(&cfg.endpoint, token.as_deref())
    }

    pub fn new(endpoint: &str, token: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            headers: backend_headers(token)?,
        })
    }

    fn functions_url(&self) -> String {
        format!("{}/{}/functions", self.endpoint, API_VERSION)
    }

    fn function_url(&self, name: &str) -> String {
        format!("{}/{}", self.functions_url(), name)
    }
}

fn backend_headers(token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    if let Some(token) = token {
        let auth_val = format!("Bearer {}", token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_val)
                .context("Invalid backend token for Authorization header")?,
        );
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Turn a non-success response into `BackendError::Status`.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

fn create_payload(definition: &UnitDefinition<'_>) -> JsonValue {
    serde_json::json!({
        "FunctionName": definition.name.as_str(),
        "Runtime": definition.runtime,
        "Role": definition.role,
        "Handler": definition.handler,
        "Description": definition.description,
        "Code": {
            "ZipFile": BASE64.encode(&definition.artifact.bytes),
        },
    })
}

fn parse_description(name: &str, raw: &str) -> Result<UnitDescription, BackendError> {
    let value: JsonValue =
        serde_json::from_str(raw).map_err(|e| BackendError::Decode(e.to_string()))?;

    let configuration = value
        .get("Configuration")
        .ok_or_else(|| BackendError::Decode("response missing 'Configuration'".to_string()))?;

    Ok(UnitDescription {
        name: configuration
            .get("FunctionName")
            .and_then(|v| v.as_str())
            .unwrap_or(name)
            .to_string(),
        role: configuration
            .get("Role")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}

#[async_trait]
impl ProvisioningBackend for HttpBackend {
    async fn create_unit(&self, definition: &UnitDefinition<'_>) -> Result<(), BackendError> {
        let resp = self
            .client
            .post(self.functions_url())
            .headers(self.headers.clone())
            .json(&create_payload(definition))
            .send()
            .await?;

        check_status(resp).await?;
        Ok(())
    }

    async fn invoke_unit(&self, name: &UnitName) -> Result<InvocationResult, BackendError> {
        let url = format!("{}/invocations", self.function_url(name.as_str()));
        let resp = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .header(INVOCATION_TYPE_HEADER, "RequestResponse")
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let status = resp.status().as_u16();
        let function_error = resp
            .headers()
            .get(FUNCTION_ERROR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let payload = resp.bytes().await?.to_vec();

        Ok(InvocationResult {
            status,
            payload,
            function_error,
        })
    }

    async fn delete_unit(&self, name: &UnitName) -> Result<(), BackendError> {
        let resp = self
            .client
            .delete(self.function_url(name.as_str()))
            .headers(self.headers.clone())
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await?;

        check_status(resp).await?;
        Ok(())
    }

    async fn describe_unit(&self, name: &str) -> Result<UnitDescription, BackendError> {
        let resp = self
            .client
            .get(self.function_url(name))
            .headers(self.headers.clone())
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let text = resp.text().await?;
        parse_description(name, &text)
    }
}
