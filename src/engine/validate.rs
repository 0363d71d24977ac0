use anyhow::Result;
use std::net::SocketAddr;

use crate::config::Config;
use crate::engine::ValidationResult;

/// Longest function name the backend accepts.
const MAX_NAME_LENGTH: usize = 64;

pub fn validate_config(cfg: &Config) -> Result<ValidationResult> {
    let mut result = ValidationResult::ok();

    validate_server(cfg, &mut result)?;
    validate_backend(cfg, &mut result)?;
    validate_unit(cfg, &mut result)?;
    validate_identity(cfg, &mut result)?;

    Ok(result)
}

/* ---------------- server ---------------- */

fn validate_server(cfg: &Config, result: &mut ValidationResult) -> Result<()> {
    if cfg.server.addr.parse::<SocketAddr>().is_err() {
        result.push_error(
            "SERVER_ADDR_INVALID",
            format!("server.addr is not a socket address: {}", cfg.server.addr),
        );
    }

    if cfg.server.powered_by.trim().is_empty() {
        result.push_error("SERVER_MARKER_EMPTY", "server.powered_by must not be empty");
    }

    Ok(())
}

/* ---------------- backend ---------------- */

fn validate_backend(cfg: &Config, result: &mut ValidationResult) -> Result<()> {
    let backend = &cfg.backend;

    match reqwest::Url::parse(&backend.endpoint) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => result.push_error(
            "BACKEND_ENDPOINT_SCHEME",
            format!("backend.endpoint must be http(s), got {}", url.scheme()),
        ),
        Err(e) => result.push_error(
            "BACKEND_ENDPOINT_INVALID",
            format!("backend.endpoint is not a URL ({}): {}", e, backend.endpoint),
        ),
    }

    if backend.create_timeout_ms == 0 {
        result.push_error(
            "BACKEND_CREATE_TIMEOUT_INVALID",
            "create_timeout_ms must be greater than zero",
        );
    }

    if backend.invoke_timeout_ms == 0 {
        result.push_error(
            "BACKEND_INVOKE_TIMEOUT_INVALID",
            "invoke_timeout_ms must be greater than zero",
        );
    }

    if backend.retry.max_attempts == 0 {
        result.push_error(
            "BACKEND_RETRY_INVALID",
            "retry.max_attempts must be at least 1",
        );
    }

    Ok(())
}

/* ---------------- unit ---------------- */

fn validate_unit(cfg: &Config, result: &mut ValidationResult) -> Result<()> {
    let len = cfg.unit.identifier_length;
    if len == 0 || len > MAX_NAME_LENGTH {
        result.push_error(
            "UNIT_IDENTIFIER_LENGTH_INVALID",
            format!(
                "identifier_length must be between 1 and {}, got {}",
                MAX_NAME_LENGTH, len
            ),
        );
    }

    if cfg.unit.runtime.trim().is_empty() {
        result.push_error("UNIT_RUNTIME_MISSING", "unit.runtime is not configured");
    }

    Ok(())
}

/* ---------------- identity ---------------- */

fn validate_identity(cfg: &Config, result: &mut ValidationResult) -> Result<()> {
    let identity = &cfg.identity;

    if let Some(name) = &identity.self_name {
        if name.trim().is_empty() {
            result.push_error("IDENTITY_SELF_NAME_EMPTY", "identity.self_name is empty");
        }
        return Ok(());
    }

    if identity.self_name_env.trim().is_empty() {
        result.push_error(
            "IDENTITY_SOURCE_MISSING",
            "either identity.self_name or identity.self_name_env must be set",
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let result = validate_config(&Config::default()).unwrap();
        assert!(result.is_valid(), "{:?}", result.errors);
    }

    #[test]
    fn reports_every_problem_with_a_code() {
        let cfg = Config::parse(
            r#"
server:
  addr: nowhere
backend:
  endpoint: ftp://backend
  invoke_timeout_ms: 0
  retry:
    max_attempts: 0
unit:
  identifier_length: 65
  runtime: ""
identity:
  self_name_env: ""
"#,
        )
        .unwrap();

        let result = validate_config(&cfg).unwrap();
        assert!(!result.is_valid());
        assert_eq!(
            result.codes(),
            vec![
                "SERVER_ADDR_INVALID",
                "BACKEND_ENDPOINT_SCHEME",
                "BACKEND_INVOKE_TIMEOUT_INVALID",
                "BACKEND_RETRY_INVALID",
                "UNIT_IDENTIFIER_LENGTH_INVALID",
                "UNIT_RUNTIME_MISSING",
                "IDENTITY_SOURCE_MISSING",
            ]
        );
    }

    #[test]
    fn explicit_self_name_wins_over_env() {
        let mut cfg = Config::default();
        cfg.identity.self_name_env = String::new();
        cfg.identity.self_name = Some("host".to_string());
        assert!(validate_config(&cfg).unwrap().is_valid());
    }
}
