//! Step counter sensor sources.
//!
//! A sensor hands out a channel of [`SensorReading`]s once registered and
//! stops delivering when unregistered. Devices without a step counter are
//! modelled by [`NoopSensor`], which refuses every registration.

pub mod feed;
pub mod noop;
pub mod types;

use crossbeam_channel::Receiver;

pub use feed::{FeedSensor, SensorFeed};
pub use noop::NoopSensor;
pub use types::{SensorAccuracy, SensorDelay, SensorReading, StepEvent};

/// A source of cumulative step counts.
pub trait StepSensor: Send {
    /// Human readable sensor name.
    fn name(&self) -> &str;

    /// Start delivering readings at the requested rate.
    fn register(&mut self, delay: SensorDelay) -> Result<Receiver<SensorReading>, SensorError>;

    /// Stop delivering readings. Calling this while unregistered is a no-op.
    fn unregister(&mut self);

    /// Check if a listener is currently registered.
    fn is_registered(&self) -> bool;
}

/// Errors that can occur when registering for step counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// The device has no step counter
    Unavailable,
    AlreadyRegistered,
}

impl std::fmt::Display for SensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorError::Unavailable => write!(f, "No step counter sensor on this device"),
            SensorError::AlreadyRegistered => write!(f, "Sensor listener is already registered"),
        }
    }
}

impl std::error::Error for SensorError {}
