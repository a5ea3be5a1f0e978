//! Controller tuning parameters
//!
//! All tunable constants for the pool controller decision core.
//! Operator-facing settings (relay schedules, sensor roles, solar target)
//! live in the configuration document, see [`crate::document`].

use serde::{Deserialize, Serialize};

/// Number of relay channels on the output bank.
pub const MAX_RELAYS: usize = 8;

/// Number of temperature sensors tracked per sensing pass.
pub const MAX_SENSORS: usize = 8;

/// Capacity of the active fault list.
pub const MAX_FAULTS: usize = 8;

/// Core controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    // --- Timing ---
    /// Minimum interval between full control passes (milliseconds)
    pub tick_interval_ms: u64,
    /// Interval between time syncs once the clock is trusted (seconds)
    pub sync_interval_secs: u64,
    /// Bounded wait for a time-source reply (milliseconds)
    pub sync_timeout_ms: u64,
    /// Hours without a successful sync after which time is unreliable
    pub time_unreliable_after_hours: u64,

    // --- Solar hysteresis bands (degrees relative to target) ---
    /// Roof must exceed target by this much before heating starts
    pub solar_on_roof_delta: f32,
    /// Heating stops once the roof falls below target plus this
    pub solar_off_roof_delta: f32,
    /// Water must be below target plus this before heating starts
    pub solar_on_water_delta: f32,
    /// Heating stops once the water exceeds target plus this
    pub solar_off_water_delta: f32,
    /// Lowest accepted solar target temperature
    pub solar_min_target: f32,
    /// Highest accepted solar target temperature
    pub solar_max_target: f32,

    // --- Sensors ---
    /// Analog readings below this are treated as missing
    pub analog_min_plausible: f32,
    /// Analog readings above this are treated as missing
    pub analog_max_plausible: f32,

    // --- Manual-mode switch ---
    /// Time a raw level must hold before it is accepted (milliseconds)
    pub switch_debounce_ms: u32,
    /// Stable switch flips that request a configuration reset
    pub reset_switch_flips: u8,
    /// Window within which the reset flips must happen (milliseconds)
    pub reset_window_ms: u32,
}

impl ControllerConfig {
    /// Staleness threshold in milliseconds.
    pub fn unreliable_after_ms(&self) -> u64 {
        self.time_unreliable_after_hours * 60 * 60 * 1000
    }

    /// Sync interval in milliseconds.
    pub fn sync_interval_ms(&self) -> u64 {
        self.sync_interval_secs * 1000
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Timing
            tick_interval_ms: 5000,
            sync_interval_secs: 120,
            sync_timeout_ms: 1500,
            time_unreliable_after_hours: 48,

            // Solar
            solar_on_roof_delta: 1.0,
            solar_off_roof_delta: -5.0,
            solar_on_water_delta: -0.5,
            solar_off_water_delta: 1.0,
            solar_min_target: 65.0,
            solar_max_target: 150.0,

            // Sensors (degrees F)
            analog_min_plausible: 0.0,
            analog_max_plausible: 212.0,

            // Switch
            switch_debounce_ms: 25,
            reset_switch_flips: 6,
            reset_window_ms: 8000,
        }
    }
}
