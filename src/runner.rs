// src/runner.rs

use crate::backend::{http::HttpBackend, ProvisioningBackend};
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::engine::{run_execution, summary::ExecutionSummary, validate_config, Engine};
use crate::execution_id::ExecutionId;
use crate::runtime;
use crate::sinks::{collecting::CollectingEventSink, log::LoggingEventSink};
use crate::util::{read_to_string, write_if_missing};

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// How long `run` waits for the detached delete before exiting.
const DRAIN_DEADLINE: Duration = Duration::from_secs(10);

/// Entry point from `main.rs`.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init => init_config(),

        Command::Validate { config } => {
            let cfg = Config::load_or_default(&config)?;
            let result = validate_config(&cfg)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_valid() {
                bail!("{:?} is not a valid config", config);
            }
            Ok(())
        }

        Command::Serve { config, addr } => {
            let mut cfg = load_checked(&config)?;
            if let Some(addr) = addr {
                cfg.server.addr = addr;
            }
            let addr = cfg.server.addr.clone();
            runtime::serve(build_engine(cfg)?, &addr).await
        }

        Command::Run {
            config,
            source,
            file,
            events,
        } => {
            let cfg = load_checked(&config)?;
            let source = read_source(source, file)?;
            run_once(build_engine(cfg)?, source, events).await
        }
    }
}

fn load_checked(path: &Path) -> Result<Config> {
    let cfg = Config::load_or_default(path)?;

    let result = validate_config(&cfg)?;
    if !result.is_valid() {
        for e in &result.errors {
            eprintln!("✖ [{}] {}", e.code, e.message);
        }
        bail!("Invalid configuration in {:?}", path);
    }

    Ok(cfg)
}

fn build_engine(cfg: Config) -> Result<Engine> {
    let backend: Arc<dyn ProvisioningBackend> = Arc::new(
        HttpBackend::from_config(&cfg.backend).context("Failed to build backend client")?,
    );
    Ok(Engine::new(backend, cfg))
}

fn read_source(source: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (source, file) {
        (Some(source), _) => Ok(source),
        (None, Some(path)) => read_to_string(&path),
        (None, None) => bail!("Provide a snippet or --file"),
    }
}

async fn run_once(engine: Engine, source: String, print_events: bool) -> Result<()> {
    let execution_id = ExecutionId::new();

    let outcome = if print_events {
        let mut sink = CollectingEventSink::new();
        let outcome = run_execution(&engine, execution_id, source, &mut sink).await;
        for event in sink.into_events() {
            eprintln!("{}", serde_json::to_string(&event)?);
        }
        outcome
    } else {
        run_execution(&engine, execution_id, source, &mut LoggingEventSink).await
    };

    engine.pending.drain(DRAIN_DEADLINE).await;

    let summary: ExecutionSummary = outcome?;
    if let Some(kind) = &summary.function_error {
        eprintln!("✖ snippet raised ({})", kind);
    }

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&summary.body)?;
    writeln!(stdout)?;
    Ok(())
}

fn init_config() -> Result<()> {
    if write_if_missing(Path::new("config.yaml"), default_config_yaml())? {
        eprintln!("Created config.yaml");
    } else {
        eprintln!("config.yaml already exists (skipping)");
    }
    Ok(())
}

fn default_config_yaml() -> &'static str {
    r#"# execute | echo
mode: execute

server:
  addr: 0.0.0.0:8080
  powered_by: "Sadness, mostly"
  api_key_env: LAMBDARUN_API_KEY

backend:
  endpoint: http://localhost:4566
  # token_env: LAMBDARUN_BACKEND_TOKEN
  create_timeout_ms: 30000
  invoke_timeout_ms: 60000
  retry:
    max_attempts: 1
    backoff_ms: 250

unit:
  runtime: python3.8
  description: "Invoke the provided codez"
  identifier_length: 16

identity:
  self_name_env: AWS_LAMBDA_FUNCTION_NAME
  # self_name: my-host-function
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_config_is_valid() {
        let mut cfg = Config::parse(default_config_yaml()).unwrap();
        assert_eq!(cfg.unit.runtime, "python3.8");
        assert_eq!(cfg.backend.endpoint, "http://localhost:4566");

        cfg.identity.self_name = Some("host".to_string());
        assert!(validate_config(&cfg).unwrap().is_valid());
    }

    #[test]
    fn inline_source_wins_over_file() {
        let source = read_source(Some("pass".into()), Some("missing.py".into())).unwrap();
        assert_eq!(source, "pass");
    }

    #[test]
    fn source_can_come_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snippet.py");
        std::fs::write(&path, "return 42").unwrap();

        assert_eq!(read_source(None, Some(path)).unwrap(), "return 42");
        assert!(read_source(None, None).is_err());
    }

    #[test]
    fn invalid_config_is_rejected_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "unit:\n  identifier_length: 0\n").unwrap();

        let err = load_checked(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }
}
