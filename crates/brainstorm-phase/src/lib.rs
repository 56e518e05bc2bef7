//! Brainstorm phase crate - countdowns for time-boxed idea generation.
//!
//! `PhaseTimer` turns a `PhaseDescriptor` and the current instant into
//! remaining time and progress. `PhaseManager` owns the active descriptor and
//! replaces it when the mode changes.

pub mod manager;
pub mod timer;

pub use manager::{PhaseEvent, PhaseManager};
pub use timer::{display_progress, format_clock, is_low_time, PhaseTick, PhaseTimer, Urgency};
