//! Device configuration types
//!
//! Loaded by the firmware from the image its build script encodes from
//! `device.toml`. Every section has working defaults, so a missing or
//! unreadable image still boots.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::backlight::{DEFAULT_BRIGHTNESS, DEFAULT_STEP_MS, MAX_BRIGHTNESS};
use crate::display::DEFAULT_BULK_THRESHOLD;
use crate::timing::TimerId;
use gnomon_protocol::{PANEL_HEIGHT, PANEL_WIDTH};

/// Longest button debounce accepted, ms
pub const MAX_DEBOUNCE_MS: u32 = 1_000;

/// Longest deferred-queue poll interval accepted, ms
pub const MAX_POLL_INTERVAL_MS: u32 = 1_000;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Default brightness above the 11-bit register range
    BrightnessOutOfRange,
    /// Ramp step zero or longer than the coarse timer can count
    RampStepOutOfRange,
    /// Zero or larger than the panel
    InvalidDimensions,
    /// Debounce zero or longer than [`MAX_DEBOUNCE_MS`]
    DebounceOutOfRange,
    /// Deferred poll zero or longer than [`MAX_POLL_INTERVAL_MS`]
    PollIntervalOutOfRange,
}

/// Display panel settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DisplayConfig {
    /// Visible width in pixels
    pub width: u16,
    /// Visible height in pixels
    pub height: u16,
    /// Backlight level at power-up (0-2047)
    pub default_brightness: u16,
    /// Smallest pixel payload sent through the bulk engine, bytes
    pub bulk_threshold: u16,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: PANEL_WIDTH,
            height: PANEL_HEIGHT,
            default_brightness: DEFAULT_BRIGHTNESS,
            bulk_threshold: DEFAULT_BULK_THRESHOLD as u16,
        }
    }
}

/// Button input settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InputConfig {
    /// How long a button line stays masked after a press, ms
    pub debounce_ms: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { debounce_ms: 50 }
    }
}

/// Timing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimingConfig {
    /// Pause between brightness ramp steps, ms
    pub ramp_step_ms: u32,
    /// Interval between deferred interrupt queue drains, ms
    pub deferred_poll_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ramp_step_ms: DEFAULT_STEP_MS,
            deferred_poll_ms: 10,
        }
    }
}

/// Complete device configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceConfig {
    pub display: DisplayConfig,
    pub input: InputConfig,
    pub timing: TimingConfig,
}

impl DeviceConfig {
    /// Check every value against what the hardware can do
    pub fn validate(&self) -> Result<(), ConfigError> {
        let display = &self.display;
        if display.width == 0
            || display.height == 0
            || display.width > PANEL_WIDTH
            || display.height > PANEL_HEIGHT
        {
            return Err(ConfigError::InvalidDimensions);
        }
        if display.default_brightness > MAX_BRIGHTNESS {
            return Err(ConfigError::BrightnessOutOfRange);
        }
        if self.timing.ramp_step_ms == 0
            || self.timing.ramp_step_ms > TimerId::Coarse.max_duration()
        {
            return Err(ConfigError::RampStepOutOfRange);
        }
        if self.input.debounce_ms == 0 || self.input.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::DebounceOutOfRange);
        }
        if self.timing.deferred_poll_ms == 0 || self.timing.deferred_poll_ms > MAX_POLL_INTERVAL_MS
        {
            return Err(ConfigError::PollIntervalOutOfRange);
        }
        Ok(())
    }
}
