//! Mock hardware and a test rig for integration tests.
//!
//! Records every relay write so tests can assert on the full output
//! history without touching real GPIO.

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use chrono::{DateTime, TimeDelta, Utc};
use embedded_hal::digital::{ErrorType, InputPin};

use poolcontrol::adapters::config_store::MemoryConfigStore;
use poolcontrol::app::commands::AppCommand;
use poolcontrol::app::events::AppEvent;
use poolcontrol::app::ports::{
    EventSink, ModeSwitchPort, RelayOutputPort, SensorPort, TimeSourcePort,
};
use poolcontrol::app::service::PoolController;
use poolcontrol::config::ControllerConfig;
use poolcontrol::document::ConfigDocument;
use poolcontrol::drivers::mode_switch::{DebouncedSwitch, SwitchEvent};
use poolcontrol::error::{ConfigError, SyncError};
use poolcontrol::sensors::ProbeReading;

pub const HOUR_MS: u64 = 60 * 60 * 1000;

// ── Mode switch pin ───────────────────────────────────────────

/// Shared pin level; clones observe the same wire.
#[derive(Clone, Default)]
pub struct MockPin(Rc<Cell<bool>>);

impl MockPin {
    pub fn set_high(&self, high: bool) {
        self.0.set(high);
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.get())
    }
}

// ── MockHw ────────────────────────────────────────────────────

/// How the scripted time source answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Up,
    Down,
    Silent,
}

pub struct MockHw {
    pub probes: Vec<ProbeReading>,
    pub analog: Option<f32>,
    pub network: Network,
    /// UTC instant the time server reports at monotonic zero.
    pub utc_at_boot: DateTime<Utc>,
    /// Monotonic time, kept in step by the rig.
    pub now_ms: u64,
    pub sync_requests: Vec<String>,
    pub writes: Vec<Vec<bool>>,
    pub pin: MockPin,
    switch: DebouncedSwitch<MockPin>,
}

impl MockHw {
    pub fn new(config: &ControllerConfig) -> Self {
        let pin = MockPin::default();
        Self {
            probes: Vec::new(),
            analog: None,
            network: Network::Up,
            utc_at_boot: DateTime::<Utc>::UNIX_EPOCH,
            now_ms: 0,
            sync_requests: Vec::new(),
            writes: Vec::new(),
            switch: DebouncedSwitch::new(pin.clone(), true, config),
            pin,
        }
    }

    /// Most recent relay levels written, all off before the first write.
    pub fn outputs(&self) -> Vec<bool> {
        self.writes.last().cloned().unwrap_or_default()
    }

    pub fn output(&self, index: usize) -> bool {
        self.outputs().get(index).copied().unwrap_or(false)
    }

    pub fn set_probe(&mut self, address: &str, reading: Option<f32>) {
        match self.probes.iter_mut().find(|p| p.address == address) {
            Some(probe) => probe.reading = reading,
            None => self.probes.push(ProbeReading {
                address: address.to_owned(),
                reading,
            }),
        }
    }
}

impl SensorPort for MockHw {
    fn scan_temperature_probes(&mut self) -> Vec<ProbeReading> {
        self.probes.clone()
    }

    fn read_analog_thermistor(&mut self) -> Option<f32> {
        self.analog
    }
}

impl RelayOutputPort for MockHw {
    fn set_relay_outputs(&mut self, levels: &[bool]) {
        self.writes.push(levels.to_vec());
    }
}

impl ModeSwitchPort for MockHw {
    fn sample_switch(&mut self, now_ms: u64) -> Option<SwitchEvent> {
        self.switch.sample_switch(now_ms)
    }

    fn switch_asserted(&self) -> bool {
        self.switch.switch_asserted()
    }
}

impl TimeSourcePort for MockHw {
    fn sync_time(&mut self, server: &str, _timeout_ms: u64) -> Result<DateTime<Utc>, SyncError> {
        self.sync_requests.push(server.to_owned());
        match self.network {
            Network::Up => {
                let elapsed = TimeDelta::milliseconds(self.now_ms as i64);
                Ok(self.utc_at_boot + elapsed)
            }
            Network::Down => Err(SyncError::NoRoute),
            Network::Silent => Err(SyncError::Timeout),
        }
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn take(&mut self) -> Vec<AppEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Controller plus its collaborators and a monotonic clock.
pub struct Rig {
    pub app: PoolController,
    pub hw: MockHw,
    pub store: MemoryConfigStore,
    pub sink: RecordingSink,
    pub now_ms: u64,
}

#[allow(dead_code)]
impl Rig {
    /// Boot against `store`: start, then load the stored configuration.
    pub fn boot_with(store: MemoryConfigStore) -> Self {
        let config = ControllerConfig::default();
        let mut rig = Self {
            hw: MockHw::new(&config),
            app: PoolController::new(config),
            store,
            sink: RecordingSink::default(),
            now_ms: 0,
        };
        rig.app.start(&mut rig.sink);
        rig.app.load_config(0, &mut rig.store, &mut rig.sink);
        rig
    }

    pub fn boot() -> Self {
        Self::boot_with(MemoryConfigStore::new())
    }

    /// Call the controller at absolute monotonic time `at_ms`.
    pub fn tick_at(&mut self, at_ms: u64) {
        self.now_ms = at_ms;
        self.hw.now_ms = at_ms;
        self.app
            .tick(at_ms, &mut self.hw, &mut self.store, &mut self.sink);
    }

    /// Advance by `ms` and call the controller once.
    pub fn advance(&mut self, ms: u64) {
        self.tick_at(self.now_ms + ms);
    }

    /// Flip the switch pin and call the controller twice so the level
    /// settles past the debounce window.
    pub fn set_switch(&mut self, high: bool) {
        self.hw.pin.set_high(high);
        self.advance(1);
        self.advance(30);
    }

    pub fn update(&mut self, json: &str) -> Result<(), ConfigError> {
        let doc = ConfigDocument::from_json(json)?;
        self.command(AppCommand::UpdateConfig(doc))
    }

    pub fn command(&mut self, cmd: AppCommand) -> Result<(), ConfigError> {
        self.app
            .handle_command(cmd, self.now_ms, &mut self.store, &mut self.sink)
    }
}
