//! Timer state structure and management

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::error::TimerError;

/// Duration the field starts with when the screen is mounted
pub const DEFAULT_MINUTES: u32 = 25;

/// Countdown state for the focus timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub configured_duration_seconds: u64,
    pub remaining_seconds: u64,
    pub running: bool,
}

impl TimerState {
    /// Create an idle timer state for the given duration
    pub fn new(minutes: NonZeroU32) -> Self {
        let configured = minutes_to_seconds(minutes);
        Self {
            configured_duration_seconds: configured,
            remaining_seconds: configured,
            running: false,
        }
    }

    /// Update the configured duration. Only allowed while idle.
    pub fn set_configured_minutes(&mut self, minutes: NonZeroU32) -> Result<(), TimerError> {
        if self.running {
            return Err(TimerError::NotIdle);
        }
        self.configured_duration_seconds = minutes_to_seconds(minutes);
        self.remaining_seconds = self.configured_duration_seconds;
        Ok(())
    }

    /// Count down from `duration_seconds`, the duration the caller scheduled for
    pub fn begin(&mut self, duration_seconds: u64) {
        self.configured_duration_seconds = duration_seconds;
        self.remaining_seconds = duration_seconds;
        self.running = true;
    }

    /// Apply one tick. Returns true when this tick finished the countdown.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.running = false;
            return true;
        }
        false
    }

    /// Freeze the countdown where it is
    pub fn halt(&mut self) {
        self.running = false;
    }

    /// Whole minutes in the configured duration
    pub fn configured_minutes(&self) -> u64 {
        self.configured_duration_seconds / 60
    }

    /// Remaining time rendered as `MM:SS`
    pub fn display(&self) -> String {
        format_time(self.remaining_seconds)
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(NonZeroU32::new(DEFAULT_MINUTES).unwrap_or(NonZeroU32::MIN))
    }
}

fn minutes_to_seconds(minutes: NonZeroU32) -> u64 {
    u64::from(minutes.get()) * 60
}

/// Render seconds as `MM:SS`. The minutes field grows past two digits.
pub fn format_time(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Parse the duration field into a positive whole number of minutes
pub fn parse_minutes(input: &str) -> Result<NonZeroU32, TimerError> {
    input
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| TimerError::InvalidDuration(input.trim().to_string()))
}
