//! Configuration document and read-only views.
//!
//! The document is the structured form exchanged with persistence and with
//! the operator API.  Every section is optional so an operator can send a
//! partial update; a stored document normally carries all of them.
//!
//! Applying a document is two-phase: [`ConfigDocument::validate`] checks
//! everything and produces a typed [`ConfigPlan`], and only a complete plan
//! is ever applied.  A rejected document therefore leaves the controller
//! untouched.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::{ControllerConfig, MAX_RELAYS, MAX_SENSORS};
use crate::error::ConfigError;
use crate::fsm::OperatingState;
use crate::relay::{RelayBank, RelayChannel, RelayState};
use crate::schedule::{DailySchedule, Interval, TimeOfDay};
use crate::sensors::{RoleMap, SensorBank, SensorRole, TemperatureSensor};
use crate::solar::SolarController;

/// Time server used until configured otherwise.
pub const DEFAULT_TIME_SERVER: &str = "us.pool.ntp.org";
/// UTC offset (hours) used until configured otherwise.
pub const DEFAULT_TZ_OFFSET: i32 = -4;
/// Factory relay names, in channel order.
pub const DEFAULT_RELAY_NAMES: [&str; MAX_RELAYS] = [
    "pump",
    "light",
    "solar_valve",
    "spa_drain",
    "spa_fill",
    "aux_1",
    "aux_2",
    "aux_3",
];
pub const DEFAULT_SOLAR_TARGET: f32 = 90.0;

// ───────────────────────────────────────────────────────────────
// Document sections
// ───────────────────────────────────────────────────────────────

/// Network credentials and time-source settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiSection {
    pub ssid: String,
    pub pw: String,
    pub ntp_server: String,
    /// Hours east of UTC.
    pub tz_offset: i32,
}

/// One `{on, off}` pair as `HH:MM:SS` literals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalEntry {
    pub on: String,
    pub off: String,
}

impl From<&Interval> for IntervalEntry {
    fn from(interval: &Interval) -> Self {
        Self {
            on: interval.on().to_string(),
            off: interval.off().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelayDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    /// Replaces the whole schedule when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Vec<IntervalEntry>>,
    /// `on` or `off`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    pub name: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarSection {
    /// `on` or `off`.
    pub enabled: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_temp: Option<f32>,
}

/// Operator-only settings: mode and clock.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneralSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// The whole configuration document.  `Default` is the empty update.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi: Option<WifiSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relays: Option<Vec<RelayDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensors: Option<Vec<SensorDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solar: Option<SolarSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general: Option<GeneralSection>,
}

/// How relay descriptors are matched and what their `state` means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Stored or factory configuration: match by position, rename channels,
    /// states are plain `On`/`Off`, `general` is ignored.
    Load,
    /// Operator update: match by name, states are manual overrides.
    Update,
}

// ───────────────────────────────────────────────────────────────
// Validated plan
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WifiPlan {
    /// New `(ssid, pw)`; only taken when both are non-empty.
    pub credentials: Option<(String, String)>,
    pub ntp_server: Option<String>,
    pub tz_offset: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPlan {
    pub index: usize,
    pub name: Option<String>,
    pub schedule: Option<DailySchedule>,
    pub state: Option<RelayState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorPlan {
    pub names: Vec<String>,
    pub roles: RoleMap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPlan {
    pub enabled: bool,
    pub target: f32,
}

/// A fully validated document, ready to apply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigPlan {
    pub wifi: Option<WifiPlan>,
    pub relays: Vec<RelayPlan>,
    pub sensors: Option<SensorPlan>,
    pub solar: Option<SolarPlan>,
    pub mode: Option<OperatingState>,
    pub time: Option<TimeOfDay>,
}

impl ConfigDocument {
    /// The factory configuration.
    pub fn factory_defaults() -> Self {
        Self {
            wifi: Some(WifiSection {
                ntp_server: DEFAULT_TIME_SERVER.to_owned(),
                tz_offset: DEFAULT_TZ_OFFSET,
                ..WifiSection::default()
            }),
            relays: Some(
                DEFAULT_RELAY_NAMES
                    .iter()
                    .map(|name| RelayDescriptor {
                        name: Some((*name).to_owned()),
                        schedule: Some(Vec::new()),
                        state: Some("off".to_owned()),
                    })
                    .collect(),
            ),
            sensors: Some(Vec::new()),
            solar: Some(SolarSection {
                enabled: "on".to_owned(),
                target_temp: Some(DEFAULT_SOLAR_TARGET),
            }),
            general: None,
        }
    }

    /// Parse a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| {
            warn!("Config document parse failed: {e}");
            ConfigError::Malformed
        })
    }

    /// Render as pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| {
            warn!("Config document render failed: {e}");
            ConfigError::Malformed
        })
    }

    /// Capture the persistable state.  Relay states are always saved as
    /// `off`.  Sensors are saved with their roles: role holders first,
    /// including those missing from the current pass, then present sensors
    /// up to [`MAX_SENSORS`].
    pub fn snapshot(
        wifi: &WifiSection,
        relays: &RelayBank,
        sensors: &SensorBank,
        solar: &SolarController,
    ) -> Self {
        let relays = relays
            .channels()
            .iter()
            .map(|channel| RelayDescriptor {
                name: Some(channel.name().to_owned()),
                schedule: Some(channel.schedule().iter().map(IntervalEntry::from).collect()),
                state: Some("off".to_owned()),
            })
            .collect();

        // Role holders first so a full bus never crowds out a role.
        let roles = sensors.roles();
        let mut entries: Vec<SensorDescriptor> = Vec::with_capacity(MAX_SENSORS);
        for role in SensorRole::NAMED {
            if let Some(holder) = roles.holder(role) {
                if entries.iter().all(|e| e.name != holder) {
                    entries.push(SensorDescriptor {
                        name: holder.to_owned(),
                        role: role.as_str().to_owned(),
                    });
                }
            }
        }
        for sensor in sensors.sensors() {
            if entries.iter().any(|e| e.name == sensor.name()) {
                continue;
            }
            if entries.len() >= MAX_SENSORS {
                debug!("Sensor list full, not saving {}", sensor.name());
                continue;
            }
            entries.push(SensorDescriptor {
                name: sensor.name().to_owned(),
                role: roles.role_of(sensor.name()).as_str().to_owned(),
            });
        }

        Self {
            wifi: Some(wifi.clone()),
            relays: Some(relays),
            sensors: Some(entries),
            solar: Some(SolarSection {
                enabled: on_off(solar.enabled()).to_owned(),
                target_temp: Some(solar.target()),
            }),
            general: None,
        }
    }

    /// Check every section against the current relay bank and produce a
    /// plan.  Nothing is modified.
    pub fn validate(
        &self,
        mode: ApplyMode,
        relays: &RelayBank,
        current_target: f32,
        config: &ControllerConfig,
    ) -> Result<ConfigPlan, ConfigError> {
        let mut plan = ConfigPlan {
            wifi: self.wifi.as_ref().map(validate_wifi),
            ..ConfigPlan::default()
        };

        if let Some(descriptors) = &self.relays {
            plan.relays = validate_relays(descriptors, mode, relays)?;
        }
        if let Some(descriptors) = &self.sensors {
            plan.sensors = Some(validate_sensors(descriptors)?);
        }
        if let Some(solar) = &self.solar {
            plan.solar = Some(validate_solar(solar, current_target, config)?);
        }
        if let (ApplyMode::Update, Some(general)) = (mode, &self.general) {
            plan.mode = general.mode.as_deref().map(parse_mode).transpose()?;
            plan.time = general
                .time
                .as_deref()
                .filter(|t| !t.is_empty())
                .map(TimeOfDay::parse)
                .transpose()?;
        }

        debug!(
            "Config validated: {} relay updates, sensors={}, solar={}",
            plan.relays.len(),
            plan.sensors.is_some(),
            plan.solar.is_some()
        );
        Ok(plan)
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn parse_on_off(token: &str) -> Option<bool> {
    match token {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

fn parse_mode(token: &str) -> Result<OperatingState, ConfigError> {
    match token {
        "run_schedule" => Ok(OperatingState::RunSchedule),
        "idle" => Ok(OperatingState::Idle),
        _ => Err(ConfigError::InvalidMode),
    }
}

fn validate_wifi(wifi: &WifiSection) -> WifiPlan {
    // Empty server and zero offset mean "keep the current value".
    WifiPlan {
        credentials: (!wifi.ssid.is_empty() && !wifi.pw.is_empty())
            .then(|| (wifi.ssid.clone(), wifi.pw.clone())),
        ntp_server: (!wifi.ntp_server.is_empty()).then(|| wifi.ntp_server.clone()),
        tz_offset: (wifi.tz_offset != 0).then_some(wifi.tz_offset),
    }
}

fn validate_relays(
    descriptors: &[RelayDescriptor],
    mode: ApplyMode,
    bank: &RelayBank,
) -> Result<Vec<RelayPlan>, ConfigError> {
    if descriptors.len() > MAX_RELAYS {
        return Err(ConfigError::TooManyRelays);
    }

    let mut plans = Vec::with_capacity(descriptors.len());
    for (position, descriptor) in descriptors.iter().enumerate() {
        let name = descriptor.name.as_deref().ok_or(ConfigError::MissingRelayName)?;

        let index = match mode {
            ApplyMode::Load => position,
            ApplyMode::Update => bank
                .index_of(name)
                .ok_or_else(|| ConfigError::UnknownRelay(name.to_owned()))?,
        };

        let schedule = descriptor
            .schedule
            .as_ref()
            .map(|entries| DailySchedule::parse(entries.iter().map(|e| (e.on.as_str(), e.off.as_str()))))
            .transpose()?;

        let state = match descriptor.state.as_deref() {
            None => None,
            Some(token) => {
                let on = parse_on_off(token).ok_or(ConfigError::InvalidRelayState)?;
                Some(match mode {
                    ApplyMode::Load => RelayState::scheduled(on),
                    ApplyMode::Update => RelayState::manual(on),
                })
            }
        };

        plans.push(RelayPlan {
            index,
            name: (mode == ApplyMode::Load && !name.is_empty()).then(|| name.to_owned()),
            schedule,
            state,
        });
    }

    if mode == ApplyMode::Load {
        check_unique_names(&plans, bank)?;
    }
    Ok(plans)
}

/// Names after a positional load must stay unique.
fn check_unique_names(plans: &[RelayPlan], bank: &RelayBank) -> Result<(), ConfigError> {
    let mut names: Vec<&str> = bank.channels().iter().map(RelayChannel::name).collect();
    for plan in plans {
        if let Some(name) = &plan.name {
            names[plan.index] = name.as_str();
        }
    }
    for (i, name) in names.iter().enumerate() {
        if !name.is_empty() && names[..i].contains(name) {
            return Err(ConfigError::DuplicateRelayName((*name).to_owned()));
        }
    }
    Ok(())
}

fn validate_sensors(descriptors: &[SensorDescriptor]) -> Result<SensorPlan, ConfigError> {
    if descriptors.len() > MAX_SENSORS {
        return Err(ConfigError::TooManySensors);
    }

    let mut roles = RoleMap::new();
    let mut names: Vec<String> = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        if names.contains(&descriptor.name) {
            return Err(ConfigError::DuplicateSensorName);
        }
        let role = SensorRole::parse(&descriptor.role)?;
        if role != SensorRole::Unused {
            if roles.holder(role).is_some() {
                return Err(ConfigError::DuplicateRole);
            }
            roles.assign(&descriptor.name, role);
        }
        names.push(descriptor.name.clone());
    }
    Ok(SensorPlan { names, roles })
}

fn validate_solar(
    solar: &SolarSection,
    current_target: f32,
    config: &ControllerConfig,
) -> Result<SolarPlan, ConfigError> {
    let enabled = parse_on_off(&solar.enabled).ok_or(ConfigError::InvalidEnabled)?;
    let target = solar.target_temp.unwrap_or(current_target);
    SolarController::check_target(target, config)?;
    Ok(SolarPlan { enabled, target })
}

// ───────────────────────────────────────────────────────────────
// Views
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayView {
    pub index: usize,
    pub name: String,
    pub state: &'static str,
    pub schedule: Vec<IntervalEntry>,
}

impl From<&RelayChannel> for RelayView {
    fn from(channel: &RelayChannel) -> Self {
        Self {
            index: channel.index(),
            name: channel.name().to_owned(),
            state: channel.state().as_str(),
            schedule: channel.schedule().iter().map(IntervalEntry::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorView {
    pub name: String,
    pub role: &'static str,
    /// `None` when missing or implausible.
    pub temp: Option<f32>,
    pub kind: &'static str,
}

impl SensorView {
    pub fn new(sensor: &TemperatureSensor, roles: &RoleMap) -> Self {
        Self {
            name: sensor.name().to_owned(),
            role: roles.role_of(sensor.name()).as_str(),
            temp: sensor.reading(),
            kind: sensor.kind().as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolarView {
    pub enabled: &'static str,
    pub state: &'static str,
    pub target_temp: f32,
}

impl From<&SolarController> for SolarView {
    fn from(solar: &SolarController) -> Self {
        Self {
            enabled: on_off(solar.enabled()),
            state: solar.state().as_str(),
            target_temp: solar.target(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub mode: &'static str,
    /// Local time of day, `HH:MM:SS`.
    pub time: String,
    /// UTC instant of the last successful sync.
    pub last_time_update: Option<DateTime<Utc>>,
    pub time_status: &'static str,
    pub errors: Vec<&'static str>,
    pub pool_water_sensor_name: Option<String>,
    pub roof_sensor_name: Option<String>,
    pub ambient_air_sensor_name: Option<String>,
}
