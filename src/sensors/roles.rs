//! Functional role assignment for temperature sensors.
//!
//! Roles are keyed by sensor name, not stored with the readings, so they
//! survive the per-tick rebuild of the sensor list.

use crate::error::ConfigError;

/// What a sensor measures for the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorRole {
    Water,
    Roof,
    Ambient,
    Unused,
}

impl SensorRole {
    /// The three roles the controller consumes.
    pub const NAMED: [SensorRole; 3] = [Self::Water, Self::Roof, Self::Ambient];

    /// Token used in the configuration document and views.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Water => "water_temp",
            Self::Roof => "solar_roof_temp",
            Self::Ambient => "ambient_air_temp",
            Self::Unused => "unused",
        }
    }

    /// Parse a configuration token.  An empty token means unused.
    pub fn parse(token: &str) -> Result<Self, ConfigError> {
        match token {
            "water_temp" => Ok(Self::Water),
            "solar_roof_temp" => Ok(Self::Roof),
            "ambient_air_temp" => Ok(Self::Ambient),
            "unused" | "" => Ok(Self::Unused),
            _ => Err(ConfigError::InvalidRole),
        }
    }
}

/// Which sensor name currently holds each named role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleMap {
    water: Option<String>,
    roof: Option<String>,
    ambient: Option<String>,
}

impl RoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `role` to `name`, replacing any previous holder.
    /// Assigning [`SensorRole::Unused`] is a no-op.
    pub fn assign(&mut self, name: &str, role: SensorRole) {
        if let Some(slot) = self.slot_mut(role) {
            *slot = Some(name.to_owned());
        }
    }

    /// Name of the sensor holding `role`, if any.
    pub fn holder(&self, role: SensorRole) -> Option<&str> {
        match role {
            SensorRole::Water => self.water.as_deref(),
            SensorRole::Roof => self.roof.as_deref(),
            SensorRole::Ambient => self.ambient.as_deref(),
            SensorRole::Unused => None,
        }
    }

    /// Role held by `name`, or [`SensorRole::Unused`].
    pub fn role_of(&self, name: &str) -> SensorRole {
        SensorRole::NAMED
            .into_iter()
            .find(|role| self.holder(*role) == Some(name))
            .unwrap_or(SensorRole::Unused)
    }

    fn slot_mut(&mut self, role: SensorRole) -> Option<&mut Option<String>> {
        match role {
            SensorRole::Water => Some(&mut self.water),
            SensorRole::Roof => Some(&mut self.roof),
            SensorRole::Ambient => Some(&mut self.ambient),
            SensorRole::Unused => None,
        }
    }
}
