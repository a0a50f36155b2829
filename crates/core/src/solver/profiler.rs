//! Wall-clock timing of stage dispatches.
//!
//! On the GPU backend dispatch is asynchronous, so these numbers measure host
//! submission cost rather than kernel execution time.

use rustc_hash::FxHashMap;
use std::time::Instant;

/// Measures time elapsed since creation.
pub struct ProfilerScope {
    start: Instant,
    name: &'static str,
}

impl ProfilerScope {
    /// Starts timing a named section.
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    /// Section name given at creation.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Most recent duration of each stage plus the last whole tick.
#[derive(Debug, Default, Clone)]
pub struct StageProfiler {
    stages: FxHashMap<&'static str, f64>,
    last_tick_ms: f64,
}

impl StageProfiler {
    /// Creates an empty profiler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the elapsed time of a finished scope under its name.
    pub fn record(&mut self, scope: &ProfilerScope) {
        self.stages.insert(scope.name(), scope.elapsed_ms());
    }

    /// Records the duration of a complete tick.
    pub fn record_tick(&mut self, time_ms: f64) {
        self.last_tick_ms = time_ms;
    }

    /// Last recorded time for a stage, if it has run.
    pub fn stage_ms(&self, name: &str) -> Option<f64> {
        self.stages.get(name).copied()
    }

    /// Last recorded tick time.
    pub fn last_tick_ms(&self) -> f64 {
        self.last_tick_ms
    }
}
