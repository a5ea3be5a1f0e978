//! Temperature sensor list and role lookup.
//!
//! The probe bus is re-scanned every sensing tick, so the list is rebuilt
//! from scratch each time: probes that vanished are simply gone.  Role
//! assignments are kept separately in a [`RoleMap`] keyed by name and
//! therefore persist across rebuilds.
//!
//! Two kinds of sensor exist: one-wire digital probes named by their
//! hex-encoded 8-byte bus address, and the single analog thermistor named
//! [`ANALOG_SENSOR_NAME`].

pub mod roles;

use core::fmt::Write;

use log::{debug, warn};

use crate::config::{ControllerConfig, MAX_SENSORS};
pub use roles::{RoleMap, SensorRole};

/// Fixed name of the analog thermistor channel.
pub const ANALOG_SENSOR_NAME: &str = "analog";

/// Hardware family of a sensor, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Digital,
    Analog,
}

impl SensorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Digital => "DS1820 Digital Sensor",
            Self::Analog => "Analog Thermistor",
        }
    }
}

/// One probe as returned by the bus scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReading {
    /// Hex-encoded bus address.
    pub address: String,
    /// Degrees, or `None` if the probe could not be read.
    pub reading: Option<f32>,
}

/// A sensor present in the current sensing pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureSensor {
    name: String,
    reading: Option<f32>,
}

impl TemperatureSensor {
    pub fn new(name: &str, reading: Option<f32>) -> Self {
        Self {
            name: name.to_owned(),
            reading,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last reading, `None` when missing or implausible.
    pub fn reading(&self) -> Option<f32> {
        self.reading
    }

    pub fn kind(&self) -> SensorKind {
        if self.name == ANALOG_SENSOR_NAME {
            SensorKind::Analog
        } else {
            SensorKind::Digital
        }
    }
}

/// Encode a one-wire bus address as upper-case hex.
pub fn address_to_hex(address: &[u8; 8]) -> String {
    let mut hex = String::with_capacity(16);
    for byte in address {
        let _ = write!(hex, "{byte:02X}");
    }
    hex
}

/// Sensors seen in the latest pass plus their role assignments.
#[derive(Debug, Clone, Default)]
pub struct SensorBank {
    sensors: heapless::Vec<TemperatureSensor, MAX_SENSORS>,
    roles: RoleMap,
}

impl SensorBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with this pass's scan results.
    ///
    /// Unreadable digital probes are skipped.  The analog channel is always
    /// listed; a reading outside the plausible range is stored as missing.
    pub fn rebuild(
        &mut self,
        probes: &[ProbeReading],
        analog: Option<f32>,
        config: &ControllerConfig,
    ) {
        self.sensors.clear();

        debug!("Sensors: {} digital probes found", probes.len());
        for probe in probes {
            match probe.reading {
                Some(temp) => self.push(TemperatureSensor::new(&probe.address, Some(temp))),
                None => warn!("Sensor \"{}\" could not be read, skipping", probe.address),
            }
        }

        let analog = analog.filter(|t| {
            let plausible = (config.analog_min_plausible..=config.analog_max_plausible).contains(t);
            if !plausible {
                warn!("Invalid analog temperature {t:.1}, treating as missing");
            }
            plausible
        });
        self.push(TemperatureSensor::new(ANALOG_SENSOR_NAME, analog));
    }

    /// Replace the list with configured names that have no reading yet,
    /// and install the matching role map.
    pub fn seed(&mut self, names: &[&str], roles: RoleMap) {
        self.sensors.clear();
        for name in names {
            self.push(TemperatureSensor::new(name, None));
        }
        self.roles = roles;
    }

    pub fn sensors(&self) -> &[TemperatureSensor] {
        &self.sensors
    }

    pub fn roles(&self) -> &RoleMap {
        &self.roles
    }

    pub fn find(&self, name: &str) -> Option<&TemperatureSensor> {
        self.sensors.iter().find(|s| s.name == name)
    }

    /// Sensor currently holding `role`, if it is in this pass's list.
    pub fn for_role(&self, role: SensorRole) -> Option<&TemperatureSensor> {
        self.roles.holder(role).and_then(|name| self.find(name))
    }

    /// Reading of the sensor holding `role`; `None` if the role is
    /// unassigned, the sensor is not on the bus, or its reading is missing.
    pub fn reading_for(&self, role: SensorRole) -> Option<f32> {
        self.for_role(role).and_then(TemperatureSensor::reading)
    }

    fn push(&mut self, sensor: TemperatureSensor) {
        if let Err(dropped) = self.sensors.push(sensor) {
            warn!("Too many temp sensors, ignoring: {}", dropped.name);
        }
    }
}
