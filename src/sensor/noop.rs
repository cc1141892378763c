//! Stand-in for devices that have no step counter.

use crate::sensor::types::{SensorDelay, SensorReading};
use crate::sensor::{SensorError, StepSensor};
use crossbeam_channel::Receiver;

/// A sensor that is never present.
#[derive(Debug, Default)]
pub struct NoopSensor;

impl NoopSensor {
    pub fn new() -> Self {
        Self
    }
}

impl StepSensor for NoopSensor {
    fn name(&self) -> &str {
        "none"
    }

    fn register(&mut self, _delay: SensorDelay) -> Result<Receiver<SensorReading>, SensorError> {
        Err(SensorError::Unavailable)
    }

    fn unregister(&mut self) {}

    fn is_registered(&self) -> bool {
        false
    }
}
