use crate::{
    engine::{
        events::ExecutionEventKind, lifecycle::Lifecycle, sink::EventSink,
        summary::ExecutionSummary, Engine,
    },
    error::{ExecutionError, PackagingError},
    execution_id::{ExecutionId, UnitName},
    identity::{ExecutionIdentity, IdentityResolver},
    metrics::StageTimer,
    packager::{package, ExecutionArtifact},
};

/// Run one snippet end to end and report every step to `sink`.
///
/// In echo mode the snippet is returned as-is. Otherwise the three
/// preparation steps run concurrently, then the unit is created, invoked
/// once and handed to a detached delete.
pub async fn run_execution<S: EventSink>(
    engine: &Engine,
    execution_id: ExecutionId,
    source: String,
    sink: &mut S,
) -> Result<ExecutionSummary, ExecutionError> {
    sink.record(&execution_id, ExecutionEventKind::ExecutionCreated);

    if !engine.config.mode.provisions() {
        sink.record(&execution_id, ExecutionEventKind::SourceEchoed);
        return Ok(ExecutionSummary::echoed(execution_id, source));
    }

    let result = execute(engine, &execution_id, source, sink).await;

    if let Err(e) = &result {
        sink.record(
            &execution_id,
            ExecutionEventKind::ExecutionFailed {
                code: e.code().to_string(),
                message: e.to_string(),
            },
        );
    }

    result
}

async fn execute<S: EventSink>(
    engine: &Engine,
    execution_id: &ExecutionId,
    source: String,
    sink: &mut S,
) -> Result<ExecutionSummary, ExecutionError> {
    let mut timer = StageTimer::start();

    // ---- preparing ----
    let (name, artifact, identity) = prepare(engine, source).await?;
    timer.prepared();

    sink.record(
        execution_id,
        ExecutionEventKind::IdentifierGenerated {
            unit: name.to_string(),
        },
    );
    sink.record(
        execution_id,
        ExecutionEventKind::ArtifactPackaged {
            size: artifact.bytes.len(),
            sha256: artifact.sha256.clone(),
        },
    );
    sink.record(
        execution_id,
        ExecutionEventKind::IdentityResolved {
            role: identity.to_string(),
        },
    );

    let lifecycle = Lifecycle::new(&engine.backend, &engine.config.backend, &engine.config.unit);

    // ---- creating ----
    let unit = lifecycle.create(&artifact, name, &identity).await?;
    timer.created();
    sink.record(
        execution_id,
        ExecutionEventKind::UnitCreated {
            unit: unit.name().to_string(),
        },
    );

    // ---- invoking ----
    let invoked = lifecycle.invoke(&unit).await;
    timer.invoked();
    if let Ok(result) = &invoked {
        sink.record(
            execution_id,
            ExecutionEventKind::UnitInvoked {
                unit: unit.name().to_string(),
                status: result.status,
                function_error: result.function_error.clone(),
            },
        );
    }

    // ---- destroy, whatever the invocation did ----
    let unit_name = unit.name().clone();
    if let Some(handle) = unit.destroy() {
        engine.pending.track(handle);
    }
    sink.record(
        execution_id,
        ExecutionEventKind::DestroyRequested {
            unit: unit_name.to_string(),
        },
    );

    let result = invoked?;
    let timings = timer.finish();

    tracing::info!(
        %execution_id,
        unit = %unit_name,
        prepare_ms = timings.prepare_ms,
        create_ms = timings.create_ms,
        invoke_ms = timings.invoke_ms,
        total_ms = timings.total_ms,
        "execution finished"
    );

    Ok(ExecutionSummary::executed(
        execution_id.clone(),
        unit_name,
        result,
        timings,
    ))
}

type Packager = fn(&str) -> Result<ExecutionArtifact, PackagingError>;

/// Generate the name, package the source and resolve the role concurrently.
///
/// The first failure wins and the others are dropped.
async fn prepare(
    engine: &Engine,
    source: String,
) -> Result<(UnitName, ExecutionArtifact, ExecutionIdentity), ExecutionError> {
    prepare_with(engine, source, package).await
}

async fn prepare_with(
    engine: &Engine,
    source: String,
    packager: Packager,
) -> Result<(UnitName, ExecutionArtifact, ExecutionIdentity), ExecutionError> {
    let length = engine.config.unit.identifier_length;
    let resolver = IdentityResolver::new(
        engine.backend.clone(),
        engine.config.identity.clone(),
        engine.config.backend.retry.clone(),
    );

    let naming = async move { Ok::<_, ExecutionError>(UnitName::generate(length)) };

    let packaging = async move {
        tokio::task::spawn_blocking(move || packager(&source))
            .await
            .map_err(|e| ExecutionError::Task(e.to_string()))?
            .map_err(ExecutionError::from)
    };

    let identity = async { resolver.resolve().await.map_err(ExecutionError::from) };

    tokio::try_join!(naming, packaging, identity)
}
