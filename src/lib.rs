//! Stepper - steps taken since a resettable baseline.
//!
//! A step counter sensor reports the total number of steps since the device
//! last rebooted. Stepper subtracts a persisted baseline from that total to
//! show the steps taken since the user last reset the count.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                          Stepper                           │
//! ├────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌──────────────────────┐   ┌─────────┐  │
//! │  │   Sensor    │──▶│     StepCounter      │──▶│ Notices │  │
//! │  │ (feed/none) │   │  ┌────────────────┐  │   └─────────┘  │
//! │  └─────────────┘   │  │  DeltaTracker  │──┼──▶ displayed   │
//! │                    │  └────────────────┘  │   (observable) │
//! │                    └──────────┬───────────┘                │
//! │                               ▼                            │
//! │                      ┌─────────────────┐                   │
//! │                      │ PreferenceStore │ (baseline only)   │
//! │                      └─────────────────┘                   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use stepper::{Config, FeedSensor, MemoryStore, StepCounter};
//!
//! let sensor = FeedSensor::new("pedometer");
//! let feed = sensor.feed();
//! let mut counter = StepCounter::new(
//!     &Config::default(),
//!     Box::new(MemoryStore::new()),
//!     Box::new(sensor),
//! );
//!
//! counter.start();
//! feed.push_steps(42.0);
//! counter.pump();
//! assert_eq!(counter.displayed(), 42.0);
//!
//! counter.reset();
//! assert_eq!(counter.displayed(), 0.0);
//! ```

pub mod config;
pub mod core;
pub mod counter;
pub mod sensor;
pub mod store;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{format_steps, DeltaTracker, Observable, ResetPolicy};
pub use counter::{Notice, StepCounter, StepStatus, RESET_HINT};
pub use sensor::{
    FeedSensor, NoopSensor, SensorAccuracy, SensorDelay, SensorError, SensorFeed, SensorReading,
    StepEvent, StepSensor,
};
pub use store::{KeyValueStore, MemoryStore, PreferenceStore, StoreError, BASELINE_KEY, PREFS_NAME};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
