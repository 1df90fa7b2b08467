//! Sample sink double.

use std::sync::Mutex;

use crate::dispatch::{PerfSample, SampleSink};

/// Keeps a copy of every slow sample it receives.
#[derive(Debug, Default)]
pub struct RecordingSampleSink {
    samples: Mutex<Vec<PerfSample>>,
}

impl RecordingSampleSink {
    /// Captures a copy of the recorded samples.
    pub fn samples(&self) -> Vec<PerfSample> {
        self.samples
            .lock()
            .expect("sample sink mutex poisoned")
            .clone()
    }
}

impl SampleSink for RecordingSampleSink {
    fn record(&self, sample: &PerfSample) {
        self.samples
            .lock()
            .expect("sample sink mutex poisoned")
            .push(sample.clone());
    }
}
