//! Step counter sensor event types.
//!
//! A step counter reports the total number of steps recorded since the device
//! last rebooted. The value only resets on reboot and keeps counting across
//! application restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cumulative step count reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    /// Timestamp when the reading was delivered
    pub timestamp: DateTime<Utc>,
    /// Steps recorded since the last reboot
    pub cumulative: f32,
}

impl StepEvent {
    pub fn new(cumulative: f32) -> Self {
        Self {
            timestamp: Utc::now(),
            cumulative,
        }
    }

    pub fn at(cumulative: f32, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            cumulative,
        }
    }
}

/// Accuracy status reported by a sensor.
///
/// Raw values follow the platform status constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorAccuracy {
    NoContact,
    Unreliable,
    Low,
    Medium,
    High,
    /// A status value outside the known range
    Other(i32),
}

impl SensorAccuracy {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            -1 => SensorAccuracy::NoContact,
            0 => SensorAccuracy::Unreliable,
            1 => SensorAccuracy::Low,
            2 => SensorAccuracy::Medium,
            3 => SensorAccuracy::High,
            other => SensorAccuracy::Other(other),
        }
    }

    pub fn raw(&self) -> i32 {
        match self {
            SensorAccuracy::NoContact => -1,
            SensorAccuracy::Unreliable => 0,
            SensorAccuracy::Low => 1,
            SensorAccuracy::Medium => 2,
            SensorAccuracy::High => 3,
            SensorAccuracy::Other(raw) => *raw,
        }
    }
}

impl fmt::Display for SensorAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

/// Requested delivery rate for a sensor registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorDelay {
    Fastest,
    Game,
    /// Rate suitable for user interface updates
    #[default]
    Ui,
    Normal,
}

impl SensorDelay {
    pub fn raw(&self) -> i32 {
        match self {
            SensorDelay::Fastest => 0,
            SensorDelay::Game => 1,
            SensorDelay::Ui => 2,
            SensorDelay::Normal => 3,
        }
    }
}

/// Anything a registered step counter can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SensorReading {
    Steps(StepEvent),
    Accuracy(SensorAccuracy),
}

impl SensorReading {
    pub fn steps(cumulative: f32) -> Self {
        SensorReading::Steps(StepEvent::new(cumulative))
    }
}
