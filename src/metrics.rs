// src/metrics.rs

//! Wall-clock timing of the pipeline stages.
//!
//! Timings are reported in logs and in the run summary; they are never used
//! to make decisions.

use serde::Serialize;
use std::time::Instant;

/// Milliseconds spent in each stage of one execution.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StageTimings {
    pub prepare_ms: u64,
    pub create_ms: u64,
    pub invoke_ms: u64,
    pub total_ms: u64,
}

/// Records stage boundaries as the pipeline moves forward.
pub struct StageTimer {
    started: Instant,
    last: Instant,
    timings: StageTimings,
}

impl StageTimer {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last: now,
            timings: StageTimings::default(),
        }
    }

    fn lap(&mut self) -> u64 {
        let now = Instant::now();
        let ms = now.duration_since(self.last).as_millis() as u64;
        self.last = now;
        ms
    }

    pub fn prepared(&mut self) {
        self.timings.prepare_ms = self.lap();
    }

    pub fn created(&mut self) {
        self.timings.create_ms = self.lap();
    }

    pub fn invoked(&mut self) {
        self.timings.invoke_ms = self.lap();
    }

    pub fn finish(mut self) -> StageTimings {
        self.timings.total_ms = self.started.elapsed().as_millis() as u64;
        self.timings
    }
}
