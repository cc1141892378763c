//! Step delta tracking.
//!
//! The tracker turns cumulative step counts into "steps since the last reset"
//! by subtracting a baseline. It knows nothing about storage or sensors; the
//! [`StepCounter`](crate::counter::StepCounter) service feeds it a loaded
//! baseline and persists whatever a reset hands back.

use crate::core::observable::Observable;
use crate::sensor::StepEvent;
use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};

/// Which baseline a reset persists.
///
/// Resetting has always zeroed the display but kept the old baseline, so the
/// next reading jumps straight back to `cumulative - baseline`. Pinning the
/// baseline to the latest reading keeps the display at zero until the next
/// step is taken. Both are kept until product decides which one is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Zero the display and persist the baseline unchanged
    #[default]
    RetainBaseline,
    /// Move the baseline to the last cumulative reading, then persist it
    PinToCumulative,
}

impl ResetPolicy {
    /// Parse a policy name as used on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "retain" | "retain_baseline" => Some(ResetPolicy::RetainBaseline),
            "pin" | "pin_to_cumulative" => Some(ResetPolicy::PinToCumulative),
            _ => None,
        }
    }
}

/// Whether the tracker accepts sensor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackerState {
    Stopped,
    Running,
}

/// Tracks displayed steps relative to a baseline.
#[derive(Debug)]
pub struct DeltaTracker {
    state: TrackerState,
    policy: ResetPolicy,
    baseline: f32,
    displayed: Observable<f32>,
    last_cumulative: Option<f32>,
    last_event_at: Option<DateTime<Utc>>,
}

impl DeltaTracker {
    pub fn new(policy: ResetPolicy) -> Self {
        Self {
            state: TrackerState::Stopped,
            policy,
            baseline: 0.0,
            displayed: Observable::new(0.0),
            last_cumulative: None,
            last_event_at: None,
        }
    }

    /// Start accepting events with a freshly loaded baseline.
    ///
    /// The displayed value is left alone until the first event arrives.
    pub fn start(&mut self, baseline: f32) {
        self.baseline = baseline;
        self.last_cumulative = None;
        self.state = TrackerState::Running;
        tracing::debug!(baseline, "tracker started");
    }

    /// Stop accepting events.
    pub fn stop(&mut self) {
        self.state = TrackerState::Stopped;
    }

    /// Apply a cumulative reading.
    ///
    /// Returns the new displayed value, or `None` if the tracker is stopped.
    pub fn on_sensor_event(&mut self, event: &StepEvent) -> Option<f32> {
        if self.state != TrackerState::Running {
            tracing::trace!(cumulative = event.cumulative, "event ignored while stopped");
            return None;
        }

        let displayed = event.cumulative - self.baseline;
        if displayed < 0.0 {
            tracing::warn!(
                cumulative = event.cumulative,
                baseline = self.baseline,
                "step count below baseline, device may have rebooted"
            );
        }

        self.last_cumulative = Some(event.cumulative);
        self.last_event_at = Some(event.timestamp);
        self.displayed.set(displayed);
        Some(displayed)
    }

    /// Zero the display and return the baseline that should be persisted.
    pub fn on_reset_requested(&mut self) -> f32 {
        self.displayed.set(0.0);

        if self.policy == ResetPolicy::PinToCumulative {
            if let Some(cumulative) = self.last_cumulative {
                self.baseline = cumulative;
            }
        }

        tracing::debug!(baseline = self.baseline, policy = ?self.policy, "reset requested");
        self.baseline
    }

    pub fn displayed(&self) -> f32 {
        self.displayed.get()
    }

    /// Subscribe to displayed value changes.
    pub fn subscribe(&mut self) -> Receiver<f32> {
        self.displayed.subscribe()
    }

    pub fn baseline(&self) -> f32 {
        self.baseline
    }

    pub fn is_running(&self) -> bool {
        self.state == TrackerState::Running
    }

    pub fn policy(&self) -> ResetPolicy {
        self.policy
    }

    pub fn last_cumulative(&self) -> Option<f32> {
        self.last_cumulative
    }

    pub fn last_event_at(&self) -> Option<DateTime<Utc>> {
        self.last_event_at
    }
}

impl Default for DeltaTracker {
    fn default() -> Self {
        Self::new(ResetPolicy::default())
    }
}

/// Format a displayed count the way it is shown to the user.
///
/// Fractional steps are truncated toward zero.
pub fn format_steps(displayed: f32) -> String {
    format!("{}", displayed.trunc() as i64)
}
