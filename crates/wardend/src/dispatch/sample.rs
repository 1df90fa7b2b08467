//! Wall-clock instrumentation for dispatched commands.
//!
//! A [`PerfSample`] is started around each handler invocation. Samples that
//! finish within their threshold are dropped; slower ones are enriched with
//! request metadata and handed to a [`SampleSink`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

/// Tracing target for slow-command records.
pub(crate) const PERF_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::perf");

/// One timed unit of work.
#[derive(Debug, Clone)]
pub struct PerfSample {
    name: String,
    started: Instant,
    elapsed: Option<Duration>,
    threshold: Option<Duration>,
    metadata: Map<String, Value>,
}

impl PerfSample {
    /// Starts timing a sample.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: Instant::now(),
            elapsed: None,
            threshold: None,
            metadata: Map::new(),
        }
    }

    /// Sample name, e.g. `dispatch_command:version`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the elapsed time above which the sample is reported.
    ///
    /// Without a threshold the sample is never reported.
    pub fn set_wall_time_threshold(&mut self, threshold: Duration) {
        self.threshold = Some(threshold);
    }

    /// Configured threshold, if any.
    pub fn wall_time_threshold(&self) -> Option<Duration> {
        self.threshold
    }

    /// Stops the clock and reports whether the sample exceeded its threshold.
    ///
    /// Calling `finish` again keeps the first measurement.
    pub fn finish(&mut self) -> bool {
        let elapsed = *self.elapsed.get_or_insert_with(|| self.started.elapsed());
        self.threshold
            .is_some_and(|threshold| elapsed > threshold)
    }

    /// Elapsed wall time, measured at [`PerfSample::finish`] or now if the
    /// sample is still running.
    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }

    /// Attaches a metadata value, replacing any previous value for `key`.
    pub fn add_meta(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Metadata attached so far.
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Hands the sample to a sink.
    pub fn log(&self, sink: &dyn SampleSink) {
        sink.record(self);
    }
}

/// Receives samples that exceeded their threshold.
pub trait SampleSink: Send + Sync {
    /// Records a finished sample.
    fn record(&self, sample: &PerfSample);
}

impl<T> SampleSink for Arc<T>
where
    T: SampleSink + ?Sized,
{
    fn record(&self, sample: &PerfSample) {
        (**self).record(sample);
    }
}

/// Default sink that emits one structured `tracing` event per slow sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSampleSink;

impl TracingSampleSink {
    /// Builds a new sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SampleSink for TracingSampleSink {
    fn record(&self, sample: &PerfSample) {
        let metadata = Value::Object(sample.metadata().clone());
        tracing::warn!(
            target: PERF_TARGET,
            event = "slow_sample",
            sample = sample.name(),
            elapsed_seconds = sample.elapsed().as_secs_f64(),
            threshold_seconds = sample
                .wall_time_threshold()
                .map_or(0.0, |threshold| threshold.as_secs_f64()),
            metadata = %metadata,
            "sample exceeded wall time threshold"
        );
    }
}
