//! Countdown over a `PhaseDescriptor`.
//!
//! All computation is relative to the `now` passed in, so ticking twice at the
//! same instant yields the same result and extension commutes with ticking.

use std::fmt;

use brainstorm_core::types::PhaseDescriptor;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Remaining seconds at or below which the display signals low time.
pub const LOW_TIME_SECS: u64 = 30;

/// One observation of a running countdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseTick {
    pub remaining_seconds: u64,
    /// `remaining / total`. Not clamped: exceeds 1.0 after an extension.
    pub progress_fraction: f64,
}

type CompletionCallback = Box<dyn FnMut(&PhaseDescriptor) + Send>;

/// Countdown for one phase.
pub struct PhaseTimer {
    descriptor: PhaseDescriptor,
    /// `end_at` for which completion has already fired.
    completed_for: Option<DateTime<Utc>>,
    on_complete: Option<CompletionCallback>,
}

impl fmt::Debug for PhaseTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseTimer")
            .field("descriptor", &self.descriptor)
            .field("completed_for", &self.completed_for)
            .finish_non_exhaustive()
    }
}

impl PhaseTimer {
    pub fn new(descriptor: PhaseDescriptor) -> Self {
        Self {
            descriptor,
            completed_for: None,
            on_complete: None,
        }
    }

    pub fn descriptor(&self) -> &PhaseDescriptor {
        &self.descriptor
    }

    /// Register the completion callback, replacing any previous one.
    ///
    /// It fires once per `end_at`, the first time a tick sees zero remaining.
    pub fn on_complete(&mut self, callback: impl FnMut(&PhaseDescriptor) + Send + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    /// Remaining time and progress at `now`, or `None` for an untimed phase.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<PhaseTick> {
        let (tick, completed) = self.advance(now)?;
        if completed {
            if let Some(callback) = self.on_complete.as_mut() {
                callback(&self.descriptor);
            }
        }
        Some(tick)
    }

    /// Tick without invoking the callback. Reports whether this observation
    /// completed the phase.
    pub(crate) fn advance(&mut self, now: DateTime<Utc>) -> Option<(PhaseTick, bool)> {
        let end_at = self.descriptor.end_at?;
        let tick = self.observe(end_at, now);
        let completed = tick.remaining_seconds == 0 && self.completed_for != Some(end_at);
        if completed {
            self.completed_for = Some(end_at);
            info!(mode = %self.descriptor.mode, "Phase time is up");
        }
        Some((tick, completed))
    }

    /// Remaining time at `now` without touching completion state.
    pub fn peek(&self, now: DateTime<Utc>) -> Option<PhaseTick> {
        self.descriptor.end_at.map(|end_at| self.observe(end_at, now))
    }

    /// Move `end_at` forward by `delta_secs`. No-op for untimed phases.
    ///
    /// The total duration is unchanged, so progress may exceed 1.0 afterwards.
    pub fn extend(&mut self, delta_secs: u32) -> bool {
        match self.descriptor.end_at.as_mut() {
            Some(end_at) => {
                *end_at += Duration::seconds(i64::from(delta_secs));
                debug!(delta_secs, end_at = %end_at, "Phase extended");
                true
            }
            None => false,
        }
    }

    fn observe(&self, end_at: DateTime<Utc>, now: DateTime<Utc>) -> PhaseTick {
        let remaining_ms = (end_at - now).num_milliseconds().max(0);
        let remaining_seconds = (remaining_ms / 1000) as u64;
        let progress_fraction = if self.descriptor.total_duration_secs == 0 {
            0.0
        } else {
            remaining_seconds as f64 / f64::from(self.descriptor.total_duration_secs)
        };
        PhaseTick {
            remaining_seconds,
            progress_fraction,
        }
    }
}

// =============================================================================
// Display helpers
// =============================================================================

/// Format seconds as `m:ss`.
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Whether the countdown is in its final stretch (but not finished).
pub fn is_low_time(remaining_seconds: u64) -> bool {
    remaining_seconds > 0 && remaining_seconds <= LOW_TIME_SECS
}

/// Progress clamped to [0, 1] for display.
pub fn display_progress(progress_fraction: f64) -> f64 {
    progress_fraction.clamp(0.0, 1.0)
}

/// Colour band of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    Calm,
    Warning,
    Critical,
}

impl Urgency {
    pub fn from_progress(progress_fraction: f64) -> Self {
        let shown = display_progress(progress_fraction);
        if shown > 0.6 {
            Urgency::Calm
        } else if shown > 0.3 {
            Urgency::Warning
        } else {
            Urgency::Critical
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Calm => write!(f, "calm"),
            Urgency::Warning => write!(f, "warning"),
            Urgency::Critical => write!(f, "critical"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
