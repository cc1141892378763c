//! Core step tracking.
//!
//! This module contains:
//! - The delta tracker state machine and its reset policies
//! - The observable cell the displayed count is published through

pub mod observable;
pub mod tracker;

// Re-export commonly used types
pub use observable::Observable;
pub use tracker::{format_steps, DeltaTracker, ResetPolicy};
