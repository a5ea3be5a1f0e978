//! Solar heating valve controller.
//!
//! A three-state hysteresis machine driving the dedicated solar-valve relay.
//! Its output is a manual-override command (`ManualOn` / `ManualOff`) so the
//! valve goes through the same reconciliation as every other relay.
//!
//! ```text
//!                 [disabling condition clears]
//!   DISABLED ───────────────────────────────▶ BYPASS
//!      ▲                                      │    ▲
//!      │ [disabled / no water sensor /        │    │ [roof too cold OR
//!      │  pump off / not running schedule]    │    │  water too hot]
//!      │                                      ▼    │
//!      └──────────────────────────────────── HEATING
//!                  [roof hot enough AND water too cold]
//! ```
//!
//! A missing water reading is a hard stop.  A missing roof reading counts
//! as "hot enough" when deciding to start and as "not too cold" while
//! heating.

use core::fmt;

use log::info;

use crate::config::ControllerConfig;
use crate::error::ConfigError;
use crate::relay::RelayState;

/// Name of the relay that drives the solar valve.
pub const SOLAR_RELAY_NAME: &str = "solar_valve";
/// Name of the pump relay the valve depends on.
pub const PUMP_RELAY_NAME: &str = "pump";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolarState {
    #[default]
    Disabled,
    Heating,
    Bypass,
}

impl SolarState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Heating => "heating",
            Self::Bypass => "bypass",
        }
    }
}

impl fmt::Display for SolarState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the controller reads in one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolarInputs {
    /// Reading of the sensor holding the water role.
    pub water: Option<f32>,
    /// Reading of the sensor holding the roof role.
    pub roof: Option<f32>,
    /// Resolved pump relay state; `None` if no pump relay exists.
    pub pump: Option<RelayState>,
    /// Whether a solar-valve relay exists.
    pub valve_found: bool,
    /// Whether the operating state is `RunSchedule`.
    pub running_schedule: bool,
}

/// Hysteresis controller state plus the operator settings.
#[derive(Debug, Clone)]
pub struct SolarController {
    state: SolarState,
    enabled: bool,
    target: f32,
}

impl Default for SolarController {
    fn default() -> Self {
        Self {
            state: SolarState::Disabled,
            enabled: false,
            target: 90.0,
        }
    }
}

impl SolarController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SolarState {
        self.state
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Reject a target outside the configured range.
    pub fn check_target(target: f32, config: &ControllerConfig) -> Result<(), ConfigError> {
        if (config.solar_min_target..=config.solar_max_target).contains(&target) {
            Ok(())
        } else {
            Err(ConfigError::TargetOutOfRange)
        }
    }

    /// Apply operator settings.  The state restarts from `Bypass` when
    /// enabled, `Disabled` otherwise.  The target must already be checked.
    pub fn configure(&mut self, enabled: bool, target: f32) {
        self.enabled = enabled;
        self.target = target;
        self.state = if enabled {
            SolarState::Bypass
        } else {
            SolarState::Disabled
        };
        info!(
            "Solar: {} target {:.1}, state {}",
            if enabled { "enabled" } else { "disabled" },
            target,
            self.state
        );
    }

    /// Advance one tick and return the command for the valve relay, or
    /// `None` if there is no valve to command.
    pub fn evaluate(&mut self, inputs: &SolarInputs, config: &ControllerConfig) -> Option<RelayState> {
        let previous = self.state;
        self.state = self.next_state(inputs, config);
        if self.state != previous {
            info!("Solar: {} -> {}", previous, self.state);
        }

        inputs
            .valve_found
            .then(|| RelayState::manual(self.state == SolarState::Heating))
    }

    fn next_state(&self, inputs: &SolarInputs, config: &ControllerConfig) -> SolarState {
        if !self.enabled {
            return SolarState::Disabled;
        }

        let pump_on = inputs.pump.is_some_and(RelayState::is_on);
        let Some(water) = inputs.water else {
            return SolarState::Disabled;
        };
        if !inputs.valve_found || !inputs.running_schedule || !pump_on {
            return SolarState::Disabled;
        }

        let target = self.target;
        match self.state {
            // Optimistic re-entry; may escalate below on the same tick.
            SolarState::Disabled | SolarState::Bypass => {
                let roof_hot_enough = inputs
                    .roof
                    .is_none_or(|roof| roof > target + config.solar_on_roof_delta);
                let water_too_cold = water < target + config.solar_on_water_delta;
                if roof_hot_enough && water_too_cold {
                    SolarState::Heating
                } else {
                    SolarState::Bypass
                }
            }
            SolarState::Heating => {
                let roof_too_cold = inputs
                    .roof
                    .is_some_and(|roof| roof < target + config.solar_off_roof_delta);
                let water_too_hot = water > target + config.solar_off_water_delta;
                if roof_too_cold || water_too_hot {
                    SolarState::Bypass
                } else {
                    SolarState::Heating
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(state: SolarState) -> SolarController {
        let mut solar = SolarController::new();
        solar.configure(true, 90.0);
        solar.state = state;
        solar
    }

    fn running(water: Option<f32>, roof: Option<f32>) -> SolarInputs {
        SolarInputs {
            water,
            roof,
            pump: Some(RelayState::On),
            valve_found: true,
            running_schedule: true,
        }
    }

    #[test]
    fn bypass_to_heating_when_roof_hot_and_water_cold() {
        let cfg = ControllerConfig::default();
        let mut solar = controller(SolarState::Bypass);
        let cmd = solar.evaluate(&running(Some(89.0), Some(92.0)), &cfg);
        assert_eq!(solar.state(), SolarState::Heating);
        assert_eq!(cmd, Some(RelayState::ManualOn));
    }

    #[test]
    fn heating_to_bypass_on_cold_roof_or_hot_water() {
        let cfg = ControllerConfig::default();
        let mut solar = controller(SolarState::Heating);
        let cmd = solar.evaluate(&running(Some(88.0), Some(84.0)), &cfg);
        assert_eq!(solar.state(), SolarState::Bypass);
        assert_eq!(cmd, Some(RelayState::ManualOff));

        let mut solar = controller(SolarState::Heating);
        solar.evaluate(&running(Some(91.5), Some(120.0)), &cfg);
        assert_eq!(solar.state(), SolarState::Bypass);
    }

    #[test]
    fn no_chatter_between_bands() {
        let cfg = ControllerConfig::default();
        let inputs = running(Some(89.7), Some(91.5));
        for start in [SolarState::Bypass, SolarState::Heating] {
            let mut solar = controller(start);
            for _ in 0..100 {
                solar.evaluate(&inputs, &cfg);
                assert_eq!(solar.state(), start);
            }
        }
    }

    #[test]
    fn missing_roof_is_heuristic() {
        let cfg = ControllerConfig::default();
        let mut solar = controller(SolarState::Bypass);
        solar.evaluate(&running(Some(80.0), None), &cfg);
        assert_eq!(solar.state(), SolarState::Heating);
        // Absence alone never stops heating.
        solar.evaluate(&running(Some(80.0), None), &cfg);
        assert_eq!(solar.state(), SolarState::Heating);
    }

    #[test]
    fn missing_water_is_hard_stop() {
        let cfg = ControllerConfig::default();
        let mut solar = controller(SolarState::Heating);
        let cmd = solar.evaluate(&running(None, Some(120.0)), &cfg);
        assert_eq!(solar.state(), SolarState::Disabled);
        assert_eq!(cmd, Some(RelayState::ManualOff));
    }

    #[test]
    fn disabling_conditions() {
        let cfg = ControllerConfig::default();
        let hot = running(Some(80.0), Some(120.0));

        let mut solar = controller(SolarState::Heating);
        solar.evaluate(&SolarInputs { pump: Some(RelayState::ManualOff), ..hot }, &cfg);
        assert_eq!(solar.state(), SolarState::Disabled);

        let mut solar = controller(SolarState::Heating);
        solar.evaluate(&SolarInputs { pump: None, ..hot }, &cfg);
        assert_eq!(solar.state(), SolarState::Disabled);

        let mut solar = controller(SolarState::Heating);
        solar.evaluate(&SolarInputs { running_schedule: false, ..hot }, &cfg);
        assert_eq!(solar.state(), SolarState::Disabled);

        let mut solar = controller(SolarState::Heating);
        let cmd = solar.evaluate(&SolarInputs { valve_found: false, ..hot }, &cfg);
        assert_eq!(solar.state(), SolarState::Disabled);
        assert_eq!(cmd, None);
    }

    #[test]
    fn disabled_escalates_in_one_tick() {
        let cfg = ControllerConfig::default();
        let mut solar = controller(SolarState::Disabled);
        solar.evaluate(&running(Some(80.0), Some(120.0)), &cfg);
        assert_eq!(solar.state(), SolarState::Heating);

        let mut solar = controller(SolarState::Disabled);
        solar.evaluate(&running(Some(95.0), Some(120.0)), &cfg);
        assert_eq!(solar.state(), SolarState::Bypass);
    }

    #[test]
    fn not_enabled_commands_valve_off() {
        let cfg = ControllerConfig::default();
        let mut solar = SolarController::new();
        solar.configure(false, 90.0);
        let cmd = solar.evaluate(&running(Some(80.0), Some(120.0)), &cfg);
        assert_eq!(solar.state(), SolarState::Disabled);
        assert_eq!(cmd, Some(RelayState::ManualOff));
    }

    #[test]
    fn manual_pump_counts_as_on() {
        let cfg = ControllerConfig::default();
        let mut solar = controller(SolarState::Bypass);
        let inputs = SolarInputs {
            pump: Some(RelayState::ManualOn),
            ..running(Some(80.0), Some(120.0))
        };
        solar.evaluate(&inputs, &cfg);
        assert_eq!(solar.state(), SolarState::Heating);
    }

    #[test]
    fn target_range_check() {
        let cfg = ControllerConfig::default();
        assert!(SolarController::check_target(65.0, &cfg).is_ok());
        assert!(SolarController::check_target(150.0, &cfg).is_ok());
        assert_eq!(
            SolarController::check_target(64.9, &cfg),
            Err(ConfigError::TargetOutOfRange)
        );
        assert!(SolarController::check_target(f32::NAN, &cfg).is_err());
    }
}
