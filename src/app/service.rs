//! Application service: the hexagonal core.
//!
//! [`PoolController`] owns the mode machine, relay bank, sensor bank, solar
//! controller, time tracker and fault list.  All I/O flows through port
//! traits injected at call sites, so the whole service runs against mock
//! adapters in tests.
//!
//! ```text
//!      SensorPort ──▶ ┌──────────────────────────┐ ──▶ RelayOutputPort
//!  ModeSwitchPort ──▶ │      PoolController       │ ──▶ EventSink
//!  TimeSourcePort ──▶ │ FSM · Relays · Solar · TZ │ ◀─▶ ConfigPort
//!                     └──────────────────────────┘
//! ```
//!
//! One call to [`PoolController::tick`] samples the switch and, at most once
//! per tick interval, runs a full pass: sensors, time, mode, relays, solar,
//! outputs, events.  Commands are handled between ticks.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::config::{ControllerConfig, MAX_RELAYS};
use crate::document::{
    ApplyMode, ConfigDocument, ConfigPlan, RelayView, SensorView, SolarView, StatusView,
    WifiPlan, WifiSection,
};
use crate::drivers::mode_switch::SwitchEvent;
use crate::error::{ConfigError, StorageError};
use crate::faults::{FaultCode, FaultSet};
use crate::fsm::context::ModeContext;
use crate::fsm::{Fsm, OperatingState};
use crate::relay::{RelayBank, RelayState};
use crate::schedule::TimeOfDay;
use crate::sensors::{SensorBank, SensorRole};
use crate::solar::{PUMP_RELAY_NAME, SOLAR_RELAY_NAME, SolarController, SolarInputs, SolarState};
use crate::time_sync::{TimeReliability, TimeTracker, WallClock};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{
    ConfigPort, EventSink, ModeSwitchPort, RelayOutputPort, SensorPort, TimeSourcePort,
};

/// Role faults, checked after every sensing pass.
const ROLE_FAULTS: [(SensorRole, FaultCode); 3] = [
    (SensorRole::Water, FaultCode::WaterSensorProblem),
    (SensorRole::Roof, FaultCode::RoofSensorProblem),
    (SensorRole::Ambient, FaultCode::AmbientSensorProblem),
];

/// State captured before a pass or command, diffed afterwards into events.
struct Snapshot {
    mode: OperatingState,
    solar: SolarState,
    relays: [RelayState; MAX_RELAYS],
}

// ───────────────────────────────────────────────────────────────
// PoolController
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct PoolController {
    config: ControllerConfig,
    fsm: Fsm,
    ctx: ModeContext,
    relays: RelayBank,
    sensors: SensorBank,
    solar: SolarController,
    tracker: TimeTracker,
    clock: WallClock,
    faults: FaultSet,
    /// Faults as last reported through the event sink.
    reported_faults: FaultSet,
    wifi: WifiSection,
    last_sync_utc: Option<DateTime<Utc>>,
    last_pass_ms: Option<u64>,
    tick_count: u64,
}

impl PoolController {
    /// Construct the controller.  Nothing is configured yet: call
    /// [`start`](Self::start) and then [`load_config`](Self::load_config).
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            fsm: Fsm::default(),
            ctx: ModeContext::new(),
            relays: RelayBank::new(),
            sensors: SensorBank::new(),
            solar: SolarController::new(),
            tracker: TimeTracker::new(),
            clock: WallClock::default(),
            faults: FaultSet::new(),
            reported_faults: FaultSet::new(),
            wifi: WifiSection::default(),
            last_sync_utc: None,
            last_pass_ms: None,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the mode machine in `Uninitialized`.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("PoolController started in {}", self.fsm.current_state());
    }

    /// Load the stored configuration.
    ///
    /// A missing document means first boot: defaults are applied and saved.
    /// A corrupt or rejected document is discarded the same way, and
    /// `MalformedConfig` is raised.
    pub fn load_config(
        &mut self,
        now_ms: u64,
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) {
        let (present, accepted) = match store.load() {
            Ok(text) => match ConfigDocument::from_json(&text) {
                Ok(doc) => (
                    true,
                    self.apply_document(&doc, ApplyMode::Load, now_ms, sink).is_ok(),
                ),
                Err(e) => {
                    sink.emit(&AppEvent::ConfigRejected(e));
                    (true, false)
                }
            },
            Err(StorageError::NotFound) => {
                info!("No stored configuration, using defaults");
                (false, false)
            }
            Err(e) => {
                warn!("Config load failed: {e}");
                (true, false)
            }
        };
        if accepted {
            return;
        }

        if present {
            warn!("Stored configuration discarded, restoring defaults");
            self.faults.raise(FaultCode::MalformedConfig);
        }
        self.apply_factory_defaults(now_ms, sink);
        self.save(store);
    }

    /// Restore factory defaults and persist them.
    pub fn reset_config(
        &mut self,
        now_ms: u64,
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) {
        warn!("Configuration reset to factory defaults");
        self.wifi = WifiSection::default();
        self.faults.clear(FaultCode::MalformedConfig);
        self.apply_factory_defaults(now_ms, sink);
        self.save(store);
        sink.emit(&AppEvent::ConfigReset);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one controller invocation.
    ///
    /// The `hw` parameter satisfies every hardware port at once, which
    /// avoids overlapping mutable borrows while keeping the boundary explicit.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut (impl SensorPort + RelayOutputPort + ModeSwitchPort + TimeSourcePort),
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) {
        // 1. Mode switch, sampled on every call
        if let Some(SwitchEvent::ResetGesture) = hw.sample_switch(now_ms) {
            self.reset_config(now_ms, store, sink);
        }

        // 2. Rate limit
        if self.fsm.current_state() == OperatingState::Uninitialized {
            return;
        }
        if self
            .last_pass_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.config.tick_interval_ms)
        {
            return;
        }
        self.last_pass_ms = Some(now_ms);
        self.tick_count += 1;

        let before = self.snapshot();
        let mut events = Vec::new();

        // 3. Sensors
        let probes = hw.scan_temperature_probes();
        let analog = hw.read_analog_thermistor();
        self.sensors.rebuild(&probes, analog, &self.config);
        self.check_role_faults();

        // 4. Time
        if self.tracker.should_attempt(now_ms, &self.config) {
            match hw.sync_time(&self.wifi.ntp_server, self.config.sync_timeout_ms) {
                Ok(utc) => {
                    self.clock.set_utc(utc, now_ms);
                    self.last_sync_utc = Some(utc);
                    self.tracker.record(now_ms, Ok(()), &mut self.faults);
                    events.push(AppEvent::TimeSynced(utc));
                }
                Err(e) => {
                    if self.tracker.record(now_ms, Err(e), &mut self.faults) {
                        events.push(AppEvent::TimeSyncFailed(e));
                    }
                }
            }
        }

        // 5. Mode machine
        self.ctx.manual_switch = hw.switch_asserted();
        self.ctx.time_stale = self.tracker.is_stale(now_ms, &self.config);
        self.fsm.tick(&mut self.ctx);

        // 6. Relays
        if self.ctx.follows_schedule() {
            let now = self.clock.time_of_day(now_ms);
            debug!("Reconciling relays at {now}");
            self.relays.reconcile(now);
        } else {
            self.relays.force_all_off();
        }

        // 7. Solar
        let running_schedule = self.fsm.current_state() == OperatingState::RunSchedule;
        let inputs = SolarInputs {
            water: self.sensors.reading_for(SensorRole::Water),
            roof: self.sensors.reading_for(SensorRole::Roof),
            pump: self.relays.find(PUMP_RELAY_NAME).map(|r| r.state()),
            valve_found: self.relays.index_of(SOLAR_RELAY_NAME).is_some(),
            running_schedule,
        };
        let command = self.solar.evaluate(&inputs, &self.config);
        if running_schedule {
            if let (Some(state), Some(valve)) = (command, self.relays.index_of(SOLAR_RELAY_NAME)) {
                self.relays.set_state(valve, state);
            }
        }

        // 8. Outputs
        hw.set_relay_outputs(&self.relays.outputs());

        // 9. Events
        self.flush(&before, events, sink);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an operator command.  An accepted update is persisted.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> Result<(), ConfigError> {
        match cmd {
            AppCommand::UpdateConfig(doc) => {
                self.apply_document(&doc, ApplyMode::Update, now_ms, sink)?;
                self.save(store);
            }
            AppCommand::ResetConfig => self.reset_config(now_ms, store, sink),
            AppCommand::SaveConfig => self.save(store),
        }
        Ok(())
    }

    /// Validate `doc` completely, then apply it.  A rejected document
    /// changes nothing.
    pub fn apply_document(
        &mut self,
        doc: &ConfigDocument,
        mode: ApplyMode,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<(), ConfigError> {
        let plan = match doc.validate(mode, &self.relays, self.solar.target(), &self.config) {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Configuration rejected: {e}");
                sink.emit(&AppEvent::ConfigRejected(e.clone()));
                return Err(e);
            }
        };

        let before = self.snapshot();
        let mut events = Vec::new();
        self.apply_plan(plan, now_ms, &mut events);

        if self.fsm.current_state() == OperatingState::Uninitialized {
            self.fsm
                .force_transition(OperatingState::RunSchedule, &mut self.ctx);
        }

        info!("Configuration applied ({mode:?})");
        events.push(AppEvent::ConfigApplied);
        self.flush(&before, events, sink);
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current operating mode.
    pub fn state(&self) -> OperatingState {
        self.fsm.current_state()
    }

    /// Full control passes executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn faults(&self) -> &FaultSet {
        &self.faults
    }

    pub fn relays(&self) -> &RelayBank {
        &self.relays
    }

    pub fn sensors(&self) -> &SensorBank {
        &self.sensors
    }

    pub fn solar_state(&self) -> SolarState {
        self.solar.state()
    }

    pub fn time_reliability(&self) -> TimeReliability {
        self.tracker.state()
    }

    pub fn wifi(&self) -> &WifiSection {
        &self.wifi
    }

    pub fn controller_config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Local time of day as the controller sees it.
    pub fn local_time(&self, now_ms: u64) -> TimeOfDay {
        self.clock.time_of_day(now_ms)
    }

    /// The persistable configuration.
    pub fn document(&self) -> ConfigDocument {
        ConfigDocument::snapshot(&self.wifi, &self.relays, &self.sensors, &self.solar)
    }

    pub fn relay_views(&self) -> Vec<RelayView> {
        self.relays.channels().iter().map(RelayView::from).collect()
    }

    pub fn sensor_views(&self) -> Vec<SensorView> {
        let roles = self.sensors.roles();
        self.sensors
            .sensors()
            .iter()
            .map(|s| SensorView::new(s, roles))
            .collect()
    }

    pub fn solar_view(&self) -> SolarView {
        SolarView::from(&self.solar)
    }

    pub fn status(&self, now_ms: u64) -> StatusView {
        let roles = self.sensors.roles();
        StatusView {
            mode: self.fsm.current_state().as_str(),
            time: self.clock.time_of_day(now_ms).to_string(),
            last_time_update: self.last_sync_utc,
            time_status: self.tracker.state().as_str(),
            errors: self.faults.iter().map(FaultCode::as_str).collect(),
            pool_water_sensor_name: roles.holder(SensorRole::Water).map(str::to_owned),
            roof_sensor_name: roles.holder(SensorRole::Roof).map(str::to_owned),
            ambient_air_sensor_name: roles.holder(SensorRole::Ambient).map(str::to_owned),
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_factory_defaults(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        // The factory document always validates.
        if let Err(e) = self.apply_document(
            &ConfigDocument::factory_defaults(),
            ApplyMode::Load,
            now_ms,
            sink,
        ) {
            warn!("Factory configuration rejected: {e}");
        }
    }

    fn apply_plan(&mut self, plan: ConfigPlan, now_ms: u64, events: &mut Vec<AppEvent>) {
        if let Some(wifi) = plan.wifi {
            self.apply_wifi(wifi);
        }

        for relay in plan.relays {
            let Some(channel) = self.relays.get_mut(relay.index) else {
                continue;
            };
            if let Some(name) = &relay.name {
                channel.set_name(name);
            }
            if let Some(schedule) = relay.schedule {
                channel.set_schedule(schedule);
            }
            if let Some(state) = relay.state {
                self.relays.set_state(relay.index, state);
            }
        }

        if let Some(sensors) = plan.sensors {
            let names: Vec<&str> = sensors.names.iter().map(String::as_str).collect();
            self.sensors.seed(&names, sensors.roles);
            self.check_role_faults();
        }

        if let Some(solar) = plan.solar {
            self.solar.configure(solar.enabled, solar.target);
        }

        if let Some(time) = plan.time {
            self.clock.set_time_of_day(time, now_ms);
            self.tracker.mark_synced(now_ms, &mut self.faults);
            let utc = self.clock.now_utc(now_ms);
            self.last_sync_utc = Some(utc);
            info!("Clock set to {time} by operator");
            events.push(AppEvent::TimeSynced(utc));
        }

        if let Some(mode) = plan.mode {
            self.fsm.force_transition(mode, &mut self.ctx);
        }
    }

    fn apply_wifi(&mut self, wifi: WifiPlan) {
        if let Some((ssid, pw)) = wifi.credentials {
            info!("Network credentials updated for '{ssid}'");
            self.wifi.ssid = ssid;
            self.wifi.pw = pw;
        }
        if let Some(server) = wifi.ntp_server {
            if server != self.wifi.ntp_server {
                if !self.wifi.ntp_server.is_empty() {
                    self.tracker.reset();
                }
                info!("Time server set to {server}");
                self.wifi.ntp_server = server;
            }
        }
        if let Some(offset) = wifi.tz_offset {
            self.wifi.tz_offset = offset;
            self.clock.set_tz_offset(offset);
        }
    }

    fn check_role_faults(&mut self) {
        for (role, code) in ROLE_FAULTS {
            self.faults.eval(code, self.sensors.reading_for(role).is_none());
        }
    }

    fn save(&self, store: &mut impl ConfigPort) {
        let json = match self.document().to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!("Config save skipped: {e}");
                return;
            }
        };
        match store.save(&json) {
            Ok(()) => info!("Configuration saved"),
            Err(e) => warn!("Config save failed: {e}"),
        }
    }

    fn snapshot(&self) -> Snapshot {
        let channels = self.relays.channels();
        Snapshot {
            mode: self.fsm.current_state(),
            solar: self.solar.state(),
            relays: core::array::from_fn(|i| channels[i].state()),
        }
    }

    /// Emit `events` plus every difference from `before`.
    fn flush(&mut self, before: &Snapshot, mut events: Vec<AppEvent>, sink: &mut impl EventSink) {
        let mode = self.fsm.current_state();
        if mode != before.mode {
            events.push(AppEvent::ModeChanged {
                from: before.mode,
                to: mode,
            });
        }

        for (channel, &from) in self.relays.channels().iter().zip(&before.relays) {
            if channel.state() != from {
                events.push(AppEvent::RelayChanged {
                    index: channel.index(),
                    name: channel.name().to_owned(),
                    from,
                    to: channel.state(),
                });
            }
        }

        let solar = self.solar.state();
        if solar != before.solar {
            events.push(AppEvent::SolarChanged {
                from: before.solar,
                to: solar,
            });
        }

        for code in self.faults.iter() {
            if !self.reported_faults.contains(code) {
                events.push(AppEvent::FaultRaised(code));
            }
        }
        for code in self.reported_faults.iter() {
            if !self.faults.contains(code) {
                events.push(AppEvent::FaultCleared(code));
            }
        }
        self.reported_faults = self.faults.clone();

        for event in &events {
            sink.emit(event);
        }
    }
}
