//! The step counter service.
//!
//! [`StepCounter`] wires a [`DeltaTracker`] to its collaborators: it loads and
//! persists the baseline through a [`KeyValueStore`], holds the sensor
//! subscription, and raises [`Notice`]s for the user-facing layer. Every
//! sensor registration made by `start` is released by `stop`, which also runs
//! on drop.

use crate::config::Config;
use crate::core::{format_steps, DeltaTracker, ResetPolicy};
use crate::sensor::{SensorAccuracy, SensorDelay, SensorError, SensorReading, StepSensor};
use crate::store::{KeyValueStore, BASELINE_KEY};
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hint shown under the step count.
pub const RESET_HINT: &str = "Long press to reset.";

/// A transient notification for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// The device has no step counter; raised at most once
    SensorUnavailable,
    AccuracyChanged(SensorAccuracy),
}

impl Notice {
    /// Text shown to the user.
    pub fn message(&self) -> String {
        match self {
            Notice::SensorUnavailable => "No sensor detected on this device".to_string(),
            Notice::AccuracyChanged(accuracy) => format!("Accuracy Changed {accuracy}"),
        }
    }
}

/// Point-in-time view of the counter, for status output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepStatus {
    pub displayed: f32,
    pub text: String,
    pub baseline: f32,
    pub running: bool,
    pub sensor_registered: bool,
    pub reset_policy: ResetPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cumulative: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event_at: Option<DateTime<Utc>>,
}

/// Tracks steps taken since the last reset.
pub struct StepCounter {
    tracker: DeltaTracker,
    store: Box<dyn KeyValueStore>,
    sensor: Box<dyn StepSensor>,
    readings: Option<Receiver<SensorReading>>,
    sensor_delay: SensorDelay,
    notify_accuracy_changes: bool,
    notice_tx: Sender<Notice>,
    notice_rx: Receiver<Notice>,
    unavailable_reported: bool,
}

impl StepCounter {
    /// Create a stopped counter. Nothing is read or registered until [`start`](Self::start).
    pub fn new(
        config: &Config,
        store: Box<dyn KeyValueStore>,
        sensor: Box<dyn StepSensor>,
    ) -> Self {
        let (notice_tx, notice_rx) = unbounded();

        Self {
            tracker: DeltaTracker::new(config.reset_policy),
            store,
            sensor,
            readings: None,
            sensor_delay: config.sensor_delay,
            notify_accuracy_changes: config.notify_accuracy_changes,
            notice_tx,
            notice_rx,
            unavailable_reported: false,
        }
    }

    /// Load the baseline and subscribe to the step counter.
    ///
    /// Safe to call again after [`stop`](Self::stop); the baseline is reloaded
    /// each time and the sensor is never registered twice.
    pub fn start(&mut self) {
        let baseline = match self.store.get_f32(BASELINE_KEY, 0.0) {
            Ok(baseline) => baseline,
            Err(e) => {
                tracing::warn!("Could not load baseline, starting from 0: {e}");
                0.0
            }
        };
        self.tracker.start(baseline);

        if self.sensor.is_registered() {
            tracing::debug!("sensor already registered");
            return;
        }

        match self.sensor.register(self.sensor_delay) {
            Ok(receiver) => {
                tracing::info!(sensor = self.sensor.name(), baseline, "step counter started");
                self.readings = Some(receiver);
            }
            Err(SensorError::Unavailable) => {
                tracing::info!("no step counter sensor available");
                if !self.unavailable_reported {
                    self.unavailable_reported = true;
                    self.notify(Notice::SensorUnavailable);
                }
            }
            Err(e) => {
                tracing::warn!("Could not register sensor listener: {e}");
            }
        }
    }

    /// Stop tracking and release the sensor subscription.
    pub fn stop(&mut self) {
        self.tracker.stop();
        if self.sensor.is_registered() {
            self.sensor.unregister();
            tracing::info!(sensor = self.sensor.name(), "step counter stopped");
        }
        self.readings = None;
    }

    /// Apply a single reading.
    pub fn handle_reading(&mut self, reading: SensorReading) {
        match reading {
            SensorReading::Steps(event) => {
                if let Some(displayed) = self.tracker.on_sensor_event(&event) {
                    tracing::debug!(cumulative = event.cumulative, displayed, "step event");
                }
            }
            SensorReading::Accuracy(accuracy) => {
                tracing::debug!(accuracy = accuracy.raw(), "accuracy changed");
                if self.notify_accuracy_changes {
                    self.notify(Notice::AccuracyChanged(accuracy));
                }
            }
        }
    }

    /// Apply every reading that is already queued. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let Some(receiver) = self.readings.clone() else {
            return 0;
        };

        let mut applied = 0;
        while let Ok(reading) = receiver.try_recv() {
            self.handle_reading(reading);
            applied += 1;
        }
        applied
    }

    /// Wait up to `timeout` for a reading, then drain the queue.
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        let Some(receiver) = self.readings.clone() else {
            std::thread::sleep(timeout);
            return 0;
        };

        match receiver.recv_timeout(timeout) {
            Ok(reading) => {
                self.handle_reading(reading);
                1 + self.pump()
            }
            Err(RecvTimeoutError::Timeout) => 0,
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("sensor disconnected");
                self.readings = None;
                0
            }
        }
    }

    /// Zero the display and persist the baseline chosen by the reset policy.
    ///
    /// Returns the persisted baseline. A failed write is logged and not retried.
    pub fn reset(&mut self) -> f32 {
        let baseline = self.tracker.on_reset_requested();
        if let Err(e) = self.store.put_f32(BASELINE_KEY, baseline) {
            tracing::warn!("Could not save baseline: {e}");
        } else {
            tracing::info!(baseline, "steps reset");
        }
        baseline
    }

    pub fn displayed(&self) -> f32 {
        self.tracker.displayed()
    }

    /// Displayed count as shown to the user.
    pub fn text(&self) -> String {
        format_steps(self.tracker.displayed())
    }

    pub fn baseline(&self) -> f32 {
        self.tracker.baseline()
    }

    pub fn is_running(&self) -> bool {
        self.tracker.is_running()
    }

    pub fn is_sensor_registered(&self) -> bool {
        self.sensor.is_registered()
    }

    /// Subscribe to changes of the displayed count.
    pub fn subscribe(&mut self) -> Receiver<f32> {
        self.tracker.subscribe()
    }

    /// Receiver for user notices.
    pub fn notices(&self) -> &Receiver<Notice> {
        &self.notice_rx
    }

    pub fn status(&self) -> StepStatus {
        StepStatus {
            displayed: self.displayed(),
            text: self.text(),
            baseline: self.baseline(),
            running: self.is_running(),
            sensor_registered: self.is_sensor_registered(),
            reset_policy: self.tracker.policy(),
            last_cumulative: self.tracker.last_cumulative(),
            last_event_at: self.tracker.last_event_at(),
        }
    }

    fn notify(&self, notice: Notice) {
        // The receiver lives in self, so this cannot disconnect
        let _ = self.notice_tx.send(notice);
    }
}

impl Drop for StepCounter {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{FeedSensor, NoopSensor};
    use crate::store::MemoryStore;

    fn counter_with(
        policy: ResetPolicy,
        store: MemoryStore,
    ) -> (StepCounter, crate::sensor::SensorFeed) {
        let config = Config {
            reset_policy: policy,
            ..Config::default()
        };
        let sensor = FeedSensor::new("test");
        let feed = sensor.feed();
        (
            StepCounter::new(&config, Box::new(store), Box::new(sensor)),
            feed,
        )
    }

    #[test]
    fn test_start_loads_baseline_and_registers() {
        let store = MemoryStore::with_value(BASELINE_KEY, 100.0);
        let (mut counter, feed) = counter_with(ResetPolicy::RetainBaseline, store);

        assert!(!feed.is_listening());
        counter.start();
        assert!(feed.is_listening());
        assert_eq!(counter.baseline(), 100.0);

        feed.push_steps(137.0);
        assert_eq!(counter.pump(), 1);
        assert_eq!(counter.displayed(), 37.0);
        assert_eq!(counter.text(), "37");
    }

    #[test]
    fn test_fresh_store_defaults_to_zero() {
        let (mut counter, feed) = counter_with(ResetPolicy::RetainBaseline, MemoryStore::new());
        counter.start();

        feed.push_steps(5.0);
        counter.pump();
        assert_eq!(counter.displayed(), 5.0);
    }

    #[test]
    fn test_reset_persists_baseline() {
        let store = MemoryStore::with_value(BASELINE_KEY, 100.0);
        let (mut counter, feed) = counter_with(ResetPolicy::PinToCumulative, store.clone());
        counter.start();

        feed.push_steps(137.0);
        counter.pump();
        assert_eq!(counter.reset(), 137.0);
        assert_eq!(counter.displayed(), 0.0);
        assert_eq!(store.get_f32(BASELINE_KEY, 0.0).unwrap(), 137.0);
    }

    #[test]
    fn test_retain_reset_writes_unchanged_baseline() {
        let store = MemoryStore::new();
        let (mut counter, feed) = counter_with(ResetPolicy::RetainBaseline, store.clone());
        counter.start();

        feed.push_steps(25.0);
        counter.pump();
        counter.reset();

        assert_eq!(counter.displayed(), 0.0);
        assert_eq!(store.get_f32(BASELINE_KEY, -1.0).unwrap(), 0.0);

        feed.push_steps(25.0);
        counter.pump();
        assert_eq!(counter.displayed(), 25.0);
    }

    #[test]
    fn test_stop_releases_sensor_and_ignores_readings() {
        let (mut counter, feed) = counter_with(ResetPolicy::RetainBaseline, MemoryStore::new());
        counter.start();
        feed.push_steps(10.0);
        counter.pump();

        counter.stop();
        assert!(!feed.is_listening());
        assert!(!counter.is_running());
        assert!(!feed.push_steps(20.0));

        counter.handle_reading(SensorReading::steps(30.0));
        assert_eq!(counter.displayed(), 10.0);
    }

    #[test]
    fn test_repeated_start_registers_once() {
        let (mut counter, feed) = counter_with(ResetPolicy::RetainBaseline, MemoryStore::new());
        counter.start();
        counter.start();
        assert!(feed.is_listening());

        counter.stop();
        counter.start();
        assert!(feed.is_listening());
    }

    #[test]
    fn test_drop_unregisters() {
        let (mut counter, feed) = counter_with(ResetPolicy::RetainBaseline, MemoryStore::new());
        counter.start();
        drop(counter);
        assert!(!feed.is_listening());
    }

    #[test]
    fn test_missing_sensor_reported_once() {
        let mut counter = StepCounter::new(
            &Config::default(),
            Box::new(MemoryStore::new()),
            Box::new(NoopSensor::new()),
        );

        counter.start();
        counter.stop();
        counter.start();
        counter.start();

        let notices: Vec<Notice> = counter.notices().try_iter().collect();
        assert_eq!(notices, vec![Notice::SensorUnavailable]);
        assert_eq!(counter.pump(), 0);
        assert_eq!(counter.displayed(), 0.0);
    }

    #[test]
    fn test_accuracy_change_notice() {
        let (mut counter, feed) = counter_with(ResetPolicy::RetainBaseline, MemoryStore::new());
        counter.start();

        feed.push_accuracy(SensorAccuracy::Low);
        counter.pump();

        let notice = counter.notices().try_recv().unwrap();
        assert_eq!(notice, Notice::AccuracyChanged(SensorAccuracy::Low));
        assert_eq!(notice.message(), "Accuracy Changed 1");
        assert_eq!(counter.displayed(), 0.0);
    }

    #[test]
    fn test_accuracy_notices_can_be_disabled() {
        let config = Config {
            notify_accuracy_changes: false,
            ..Config::default()
        };
        let mut counter = StepCounter::new(
            &config,
            Box::new(MemoryStore::new()),
            Box::new(FeedSensor::new("test")),
        );
        counter.start();
        counter.handle_reading(SensorReading::Accuracy(SensorAccuracy::High));

        assert!(counter.notices().try_recv().is_err());
    }

    #[test]
    fn test_status_snapshot() {
        let store = MemoryStore::with_value(BASELINE_KEY, 4.0);
        let (mut counter, feed) = counter_with(ResetPolicy::RetainBaseline, store);
        counter.start();
        feed.push_steps(10.5);
        counter.pump();

        let status = counter.status();
        assert_eq!(status.displayed, 6.5);
        assert_eq!(status.text, "6");
        assert_eq!(status.baseline, 4.0);
        assert!(status.running);
        assert!(status.sensor_registered);
        assert_eq!(status.last_cumulative, Some(10.5));
        assert!(status.last_event_at.is_some());
    }

    #[test]
    fn test_pump_timeout_without_readings() {
        let (mut counter, _feed) = counter_with(ResetPolicy::RetainBaseline, MemoryStore::new());
        counter.start();
        assert_eq!(counter.pump_timeout(Duration::from_millis(10)), 0);
    }
}
