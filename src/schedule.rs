// src/schedule.rs
//! When to redraw the e-ink panel
//!
//! A full e-ink refresh is slow and visible, so the panel is redrawn on a
//! cadence tied to the GPS clock rather than on every sentence.

use crate::gps::Fix;

/// Polls between redraws while searching for satellites
pub const DEFAULT_IDLE_POLLS: u32 = 10;

/// Seconds between redraws once a fix is held
pub const DEFAULT_REFRESH_SECS: u32 = 10;

/// A due second this far in the past is treated as wrapped
const DUE_WINDOW_SECS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No valid fix seen yet; counts polls
    Searching { polls: u32 },
    /// Redraw when the GPS second reaches `next`
    Tracking { next: u32 },
}

#[derive(Debug, Clone)]
pub struct RefreshSchedule {
    interval: u32,
    idle_polls: u32,
    phase: Phase,
}

impl RefreshSchedule {
    /// `interval` is kept inside 1..30 seconds so the wrap window stays
    /// unambiguous
    pub fn new(interval: u32, idle_polls: u32) -> Self {
        Self {
            interval: interval.clamp(1, DUE_WINDOW_SECS - 1),
            idle_polls: idle_polls.max(1),
            phase: Phase::Searching { polls: 0 },
        }
    }

    /// Whether any valid fix has been seen
    pub fn is_tracking(&self) -> bool {
        matches!(self.phase, Phase::Tracking { .. })
    }

    /// Called once per update period. Returns true when the panel is due.
    pub fn poll(&mut self, fix: &Fix) -> bool {
        if let Phase::Searching { .. } = self.phase {
            if let Some(second) = fix.second().filter(|_| fix.valid) {
                self.phase = Phase::Tracking { next: second };
            }
        }

        match self.phase {
            Phase::Searching { polls } => {
                self.phase = Phase::Searching {
                    polls: (polls + 1) % self.idle_polls,
                };
                polls == 0
            }
            Phase::Tracking { next } => {
                let Some(second) = fix.second() else {
                    return false;
                };
                if second >= next && second - next < DUE_WINDOW_SECS {
                    self.phase = Phase::Tracking {
                        next: (second + self.interval) % 60,
                    };
                    true
                } else {
                    false
                }
            }
        }
    }
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_SECS, DEFAULT_IDLE_POLLS)
    }
}
