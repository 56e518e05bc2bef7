//! Owner of the active phase.
//!
//! Selecting a timed mode creates a fresh descriptor; selecting another mode
//! replaces it, and completion discards it once reported.

use brainstorm_core::config::PhaseConfig;
use brainstorm_core::types::{PhaseDescriptor, PhaseMode};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::timer::{PhaseTick, PhaseTimer};

/// What one manager tick observed.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseEvent {
    /// The countdown is still running.
    Tick(PhaseTick),
    /// Time ran out. The descriptor has been discarded.
    Completed(PhaseDescriptor),
}

/// Single writer of the active phase descriptor.
#[derive(Debug)]
pub struct PhaseManager {
    mode: PhaseMode,
    timer: Option<PhaseTimer>,
    extend_secs: u32,
}

impl Default for PhaseManager {
    fn default() -> Self {
        Self::new(&PhaseConfig::default())
    }
}

impl PhaseManager {
    pub fn new(config: &PhaseConfig) -> Self {
        Self {
            mode: PhaseMode::Untimed,
            timer: None,
            extend_secs: config.extend_secs,
        }
    }

    pub fn mode(&self) -> PhaseMode {
        self.mode
    }

    /// The running descriptor, if a timed phase is active.
    pub fn descriptor(&self) -> Option<&PhaseDescriptor> {
        self.timer.as_ref().map(PhaseTimer::descriptor)
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Switch to `mode` starting at `now`, replacing any running phase.
    pub fn select_mode(&mut self, mode: PhaseMode, now: DateTime<Utc>) -> Option<&PhaseDescriptor> {
        if self.timer.take().is_some() {
            debug!(previous = %self.mode, "Replacing running phase");
        }
        self.mode = mode;
        let descriptor = PhaseDescriptor::starting_at(mode, now);
        if descriptor.is_timed() {
            info!(mode = %mode, total_secs = descriptor.total_duration_secs, "Phase started");
            self.timer = Some(PhaseTimer::new(descriptor));
        } else {
            info!(mode = %mode, "Untimed phase selected");
        }
        self.descriptor()
    }

    /// Add `secs` to the running phase. Returns false when nothing is running.
    pub fn extend(&mut self, secs: u32) -> bool {
        self.timer.as_mut().is_some_and(|t| t.extend(secs))
    }

    /// Add the configured extension (30 s by default).
    pub fn extend_default(&mut self) -> bool {
        self.extend(self.extend_secs)
    }

    /// Observe the running phase at `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<PhaseEvent> {
        let (tick, completed) = self.timer.as_mut()?.advance(now)?;
        if !completed {
            return Some(PhaseEvent::Tick(tick));
        }
        let timer = self.timer.take()?;
        Some(PhaseEvent::Completed(timer.descriptor().clone()))
    }

    /// Discard the running phase without completing it.
    pub fn clear(&mut self) {
        if self.timer.take().is_some() {
            debug!(mode = %self.mode, "Phase cleared");
        }
        self.mode = PhaseMode::Untimed;
    }
}
