use crate::engine::events::{ExecutionEvent, ExecutionEventKind};
use crate::engine::sink::EventSink;

/// Writes every event to the `tracing` subscriber. Used by the HTTP server,
/// where nobody reads the event list back.
#[derive(Debug, Default)]
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn emit(&mut self, event: ExecutionEvent) {
        let id = &event.execution_id;
        match &event.kind {
            ExecutionEventKind::ExecutionFailed { code, message } => {
                tracing::error!(execution_id = %id, %code, "{message}");
            }
            kind => {
                tracing::debug!(execution_id = %id, event = ?kind, "execution event");
            }
        }
    }
}
