use crate::engine::events::ExecutionEvent;
#[cfg(test)]
use crate::engine::events::ExecutionEventKind;
use crate::engine::sink::EventSink;

/// Keeps every event of one execution in memory.
///
/// Backs `lambdarun run --events` and the engine tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Vec<ExecutionEvent>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Event kinds in emission order, without ids or timestamps.
    #[cfg(test)]
    pub fn kinds(&self) -> Vec<ExecutionEventKind> {
        self.events.iter().map(|e| e.kind.clone()).collect()
    }

    /// Failure code of the execution, if it failed.
    #[cfg(test)]
    pub fn failure_code(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|e| match &e.kind {
            ExecutionEventKind::ExecutionFailed { code, .. } => Some(code.as_str()),
            _ => None,
        })
    }

    pub fn into_events(self) -> Vec<ExecutionEvent> {
        self.events
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&mut self, event: ExecutionEvent) {
        self.events.push(event);
    }
}
