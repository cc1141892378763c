//! Externally fed step counter.
//!
//! The platform (or a console, or an HTTP handler) pushes readings into a
//! [`SensorFeed`]. Readings are only delivered while a listener is registered,
//! the same way a real sensor only calls back registered listeners.

use crate::sensor::types::{SensorAccuracy, SensorDelay, SensorReading, StepEvent};
use crate::sensor::{SensorError, StepSensor};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const FEED_CAPACITY: usize = 10_000;

/// A step counter whose readings come from a [`SensorFeed`].
pub struct FeedSensor {
    name: String,
    sender: Sender<SensorReading>,
    receiver: Receiver<SensorReading>,
    registered: Arc<AtomicBool>,
    /// Held while a push checks `registered` and sends, and while unregister drains
    gate: Arc<Mutex<()>>,
    delay: Option<SensorDelay>,
}

impl FeedSensor {
    pub fn new(name: impl Into<String>) -> Self {
        // Use a bounded channel to prevent unbounded memory growth
        let (sender, receiver) = bounded(FEED_CAPACITY);

        Self {
            name: name.into(),
            sender,
            receiver,
            registered: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(Mutex::new(())),
            delay: None,
        }
    }

    /// Get a handle for pushing readings into this sensor.
    pub fn feed(&self) -> SensorFeed {
        SensorFeed {
            sender: self.sender.clone(),
            registered: self.registered.clone(),
            gate: self.gate.clone(),
        }
    }

    /// Delivery rate of the current registration.
    pub fn delay(&self) -> Option<SensorDelay> {
        self.delay
    }
}

impl StepSensor for FeedSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, delay: SensorDelay) -> Result<Receiver<SensorReading>, SensorError> {
        if self.registered.swap(true, Ordering::SeqCst) {
            return Err(SensorError::AlreadyRegistered);
        }
        self.delay = Some(delay);
        tracing::debug!(sensor = %self.name, delay = delay.raw(), "listener registered");
        Ok(self.receiver.clone())
    }

    fn unregister(&mut self) {
        let _gate = lock_gate(&self.gate);
        if !self.registered.swap(false, Ordering::SeqCst) {
            return;
        }
        self.delay = None;

        // Readings queued for the old listener must not reach the next one
        while self.receiver.try_recv().is_ok() {}
        tracing::debug!(sensor = %self.name, "listener unregistered");
    }

    fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }
}

/// Cloneable handle that pushes readings into a [`FeedSensor`].
#[derive(Clone)]
pub struct SensorFeed {
    sender: Sender<SensorReading>,
    registered: Arc<AtomicBool>,
    gate: Arc<Mutex<()>>,
}

impl SensorFeed {
    /// Push a reading. Returns `false` if nobody is listening or the queue is full.
    pub fn push(&self, reading: SensorReading) -> bool {
        let _gate = lock_gate(&self.gate);
        if !self.registered.load(Ordering::SeqCst) {
            return false;
        }
        match self.sender.try_send(reading) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("sensor queue full, dropping reading");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Push a cumulative step count stamped with the current time.
    pub fn push_steps(&self, cumulative: f32) -> bool {
        self.push(SensorReading::Steps(StepEvent::new(cumulative)))
    }

    /// Push an accuracy change.
    pub fn push_accuracy(&self, accuracy: SensorAccuracy) -> bool {
        self.push(SensorReading::Accuracy(accuracy))
    }

    /// Check if the sensor currently has a registered listener.
    pub fn is_listening(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }
}

fn lock_gate(gate: &Mutex<()>) -> MutexGuard<'_, ()> {
    // The guarded data is `()`, so a poisoned lock is still usable
    gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
