use crate::engine::events::{ExecutionEvent, ExecutionEventKind};
use crate::execution_id::ExecutionId;

/// Receives lifecycle events for one execution, in order.
pub trait EventSink: Send {
    fn emit(&mut self, event: ExecutionEvent);

    /// Stamp `kind` with the execution id and the current time.
    fn record(&mut self, execution_id: &ExecutionId, kind: ExecutionEventKind) {
        self.emit(ExecutionEvent::new(execution_id, kind));
    }
}
