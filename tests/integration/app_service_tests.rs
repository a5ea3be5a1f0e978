//! Integration tests for the PoolController → relays pipeline.
//!
//! These run on the host and drive the full tick through mock ports: relay
//! writes are recorded, the time source is scripted and configuration lives
//! in an in-memory store.

use chrono::{DateTime, Utc};

use poolcontrol::adapters::config_store::MemoryConfigStore;
use poolcontrol::app::commands::AppCommand;
use poolcontrol::app::events::AppEvent;
use poolcontrol::app::ports::ConfigPort;
use poolcontrol::document::ConfigDocument;
use poolcontrol::error::ConfigError;
use poolcontrol::faults::FaultCode;
use poolcontrol::fsm::OperatingState;
use poolcontrol::relay::RelayState;
use poolcontrol::solar::SolarState;
use poolcontrol::time_sync::TimeReliability;

use super::mock_hw::{HOUR_MS, Network, Rig};

const PUMP: usize = 0;
const LIGHT: usize = 1;
const VALVE: usize = 2;

const WATER_PROBE: &str = "28FF4A1C65160321";

fn utc(text: &str) -> DateTime<Utc> {
    text.parse().unwrap()
}

/// Booted rig whose time server reports local noon (UTC-4) at boot.
fn noon_rig() -> Rig {
    let mut rig = Rig::boot();
    rig.hw.utc_at_boot = utc("2024-06-01T16:00:00Z");
    rig
}

fn pump_schedule_8_to_20(rig: &mut Rig) {
    rig.update(r#"{"relays":[{"name":"pump","schedule":[{"on":"08:00:00","off":"20:00:00"}]}]}"#)
        .unwrap();
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn first_boot_runs_schedule_with_factory_relays() {
    let rig = Rig::boot();
    assert_eq!(rig.app.state(), OperatingState::RunSchedule);
    assert!(rig.sink.contains(&AppEvent::Started(OperatingState::Uninitialized)));
    assert!(rig.sink.contains(&AppEvent::ModeChanged {
        from: OperatingState::Uninitialized,
        to: OperatingState::RunSchedule,
    }));

    let names: Vec<String> = rig.app.relay_views().into_iter().map(|r| r.name).collect();
    assert_eq!(
        names,
        ["pump", "light", "solar_valve", "spa_drain", "spa_fill", "aux_1", "aux_2", "aux_3"]
    );
    assert_eq!(rig.store.saves(), 1);
    assert!(!rig.app.faults().contains(FaultCode::MalformedConfig));
}

#[test]
fn corrupt_stored_config_falls_back_to_defaults() {
    let rig = Rig::boot_with(MemoryConfigStore::with_document("{\"relays\": [ oops"));
    assert_eq!(rig.app.state(), OperatingState::RunSchedule);
    assert!(rig.app.status(0).errors.contains(&"malformed configuration"));

    // The defaults were written back and load cleanly.
    let saved = rig.store.load().unwrap();
    let doc = ConfigDocument::from_json(&saved).unwrap();
    assert_eq!(doc, ConfigDocument::from_json(&rig.app.document().to_json().unwrap()).unwrap());
}

#[test]
fn invalid_stored_config_falls_back_to_defaults() {
    let stored = r#"{"relays":[{"name":"pump","schedule":[{"on":"10:00:00","off":"09:00:00"}]}]}"#;
    let rig = Rig::boot_with(MemoryConfigStore::with_document(stored));
    assert!(rig.app.faults().contains(FaultCode::MalformedConfig));
    assert!(rig.app.relays().get(PUMP).unwrap().schedule().is_empty());
    assert!(rig.sink.contains(&AppEvent::ConfigRejected(ConfigError::OffNotAfterOn)));
}

#[test]
fn saved_config_survives_a_reboot() {
    let mut rig = noon_rig();
    pump_schedule_8_to_20(&mut rig);
    rig.update(r#"{"relays":[{"name":"light","state":"on"}],"solar":{"enabled":"off","target_temp":82}}"#)
        .unwrap();
    let saved = rig.store.document().unwrap().to_owned();

    let rebooted = Rig::boot_with(MemoryConfigStore::with_document(&saved));
    let relays = rebooted.app.relays();
    assert_eq!(relays.get(PUMP).unwrap().schedule().len(), 1);
    // Overrides are never persisted.
    assert_eq!(relays.get(LIGHT).unwrap().state(), RelayState::Off);
    let solar = rebooted.app.solar_view();
    assert_eq!(solar.enabled, "off");
    assert_eq!(solar.target_temp, 82.0);
    assert!(!rebooted.app.faults().contains(FaultCode::MalformedConfig));
}

#[test]
fn saved_config_with_full_sensor_bus_reloads() {
    const MISSING_WATER_SENSOR: &str = "DEADBEEF00000001";

    let mut rig = noon_rig();
    pump_schedule_8_to_20(&mut rig);
    rig.update(&format!(
        r#"{{"sensors":[{{"name":"{MISSING_WATER_SENSOR}","role":"water_temp"}}]}}"#
    ))
    .unwrap();
    for i in 1..=7 {
        rig.hw.set_probe(&format!("28FF00000000000{i}"), Some(78.0));
    }
    rig.hw.analog = Some(75.0);
    rig.tick_at(0);
    assert_eq!(rig.app.sensors().sensors().len(), 8);
    assert!(rig.app.faults().contains(FaultCode::WaterSensorProblem));

    rig.command(AppCommand::SaveConfig).unwrap();
    let saved = rig.store.document().unwrap().to_owned();
    let doc = ConfigDocument::from_json(&saved).unwrap();
    let sensors = doc.sensors.unwrap();
    assert_eq!(sensors.len(), 8);
    assert_eq!(sensors[0].name, MISSING_WATER_SENSOR);

    let rebooted = Rig::boot_with(MemoryConfigStore::with_document(&saved));
    assert!(!rebooted.app.faults().contains(FaultCode::MalformedConfig));
    assert_eq!(rebooted.app.relays().get(PUMP).unwrap().schedule().len(), 1);
    assert_eq!(
        rebooted.app.status(0).pool_water_sensor_name.as_deref(),
        Some(MISSING_WATER_SENSOR)
    );
}

// ── Schedules and overrides ───────────────────────────────────

#[test]
fn pump_follows_daily_schedule() {
    let mut rig = noon_rig();
    pump_schedule_8_to_20(&mut rig);

    rig.tick_at(0);
    assert_eq!(rig.app.local_time(0).to_string(), "12:00:00");
    assert!(rig.hw.output(PUMP));
    assert!(!rig.hw.output(LIGHT));
    assert!(rig.sink.contains(&AppEvent::RelayChanged {
        index: PUMP,
        name: "pump".into(),
        from: RelayState::Off,
        to: RelayState::On,
    }));

    rig.tick_at(9 * HOUR_MS);
    assert_eq!(rig.app.local_time(9 * HOUR_MS).to_string(), "21:00:00");
    assert!(!rig.hw.output(PUMP));
}

#[test]
fn manual_override_holds_until_schedule_agrees() {
    let mut rig = noon_rig();
    pump_schedule_8_to_20(&mut rig);
    rig.tick_at(0);
    assert!(rig.hw.output(PUMP));

    rig.update(r#"{"relays":[{"name":"pump","state":"off"}]}"#).unwrap();
    rig.tick_at(HOUR_MS);
    assert!(!rig.hw.output(PUMP));
    assert_eq!(rig.app.relay_views()[PUMP].state, "off (manual)");

    // At 21:00 the schedule says off too; the override is dropped.
    rig.tick_at(9 * HOUR_MS);
    assert_eq!(rig.app.relays().get(PUMP).unwrap().state(), RelayState::Off);

    // Next morning the schedule drives the pump again.
    rig.tick_at(21 * HOUR_MS);
    assert_eq!(rig.app.local_time(21 * HOUR_MS).to_string(), "09:00:00");
    assert!(rig.hw.output(PUMP));
}

#[test]
fn rejected_update_leaves_everything_untouched() {
    let mut rig = noon_rig();
    pump_schedule_8_to_20(&mut rig);
    rig.tick_at(0);
    let saves = rig.store.saves();
    let before = rig.app.relay_views();

    let result = rig.update(
        r#"{"relays":[
            {"name":"light","state":"on"},
            {"name":"pump","schedule":[{"on":"09:00:00","off":"12:00:00"},{"on":"11:00:00","off":"13:00:00"}]}
        ]}"#,
    );
    assert_eq!(result, Err(ConfigError::Overlap));
    assert_eq!(rig.app.relay_views(), before);
    assert_eq!(rig.store.saves(), saves);
    assert!(rig.sink.contains(&AppEvent::ConfigRejected(ConfigError::Overlap)));
}

#[test]
fn idle_command_turns_everything_off_until_resumed() {
    let mut rig = noon_rig();
    pump_schedule_8_to_20(&mut rig);
    rig.tick_at(0);

    rig.update(r#"{"general":{"mode":"idle"}}"#).unwrap();
    rig.tick_at(10_000);
    assert_eq!(rig.app.state(), OperatingState::Idle);
    assert!(rig.hw.outputs().iter().all(|on| !on));

    rig.update(r#"{"general":{"mode":"run_schedule"}}"#).unwrap();
    rig.tick_at(20_000);
    assert!(rig.hw.output(PUMP));
}

// ── Time reliability ──────────────────────────────────────────

#[test]
fn stale_time_forces_relays_off_until_resync() {
    let mut rig = Rig::boot();
    rig.hw.network = Network::Down;
    rig.update(r#"{"general":{"time":"12:00:00"}}"#).unwrap();
    pump_schedule_8_to_20(&mut rig);
    rig.tick_at(0);
    assert!(rig.hw.output(PUMP));
    assert_eq!(rig.app.time_reliability(), TimeReliability::Ok);

    rig.tick_at(HOUR_MS);
    assert_eq!(rig.app.time_reliability(), TimeReliability::NoNetwork);
    assert_eq!(rig.app.state(), OperatingState::RunSchedule);
    assert!(rig.sink.contains(&AppEvent::FaultRaised(FaultCode::NoNetwork)));

    rig.tick_at(49 * HOUR_MS);
    assert_eq!(rig.app.state(), OperatingState::NoReliableTime);
    assert!(rig.hw.outputs().iter().all(|on| !on));
    assert_eq!(rig.app.status(rig.now_ms).mode, "idle (no reliable time source)");

    rig.hw.network = Network::Up;
    rig.hw.utc_at_boot = utc("2024-06-01T16:00:00Z");
    rig.advance(5000);
    assert_eq!(rig.app.state(), OperatingState::RunSchedule);
    assert_eq!(rig.app.time_reliability(), TimeReliability::Ok);
    assert!(rig.sink.contains(&AppEvent::FaultCleared(FaultCode::NoTimeSource)));
}

#[test]
fn silent_server_reports_error_without_network_fault() {
    let mut rig = Rig::boot();
    rig.hw.network = Network::Silent;
    rig.tick_at(0);
    assert_eq!(rig.app.time_reliability(), TimeReliability::Error);
    let status = rig.app.status(0);
    assert_eq!(status.time_status, "error");
    assert!(status.errors.contains(&"no NTP time"));
    assert!(!status.errors.contains(&"no wifi"));
    assert_eq!(status.last_time_update, None);
    assert_eq!(rig.hw.sync_requests, ["us.pool.ntp.org"]);
}

#[test]
fn trusted_clock_syncs_once_per_interval() {
    let mut rig = noon_rig();
    for i in 0..=24 {
        rig.tick_at(i * 5000);
    }
    // Two minutes of five-second ticks: boot sync plus one refresh at 120 s.
    assert_eq!(rig.hw.sync_requests.len(), 2);
    assert_eq!(
        rig.app.status(rig.now_ms).last_time_update,
        Some(utc("2024-06-01T16:02:00Z"))
    );
}

// ── Manual switch ─────────────────────────────────────────────

#[test]
fn manual_switch_overrides_every_configured_mode() {
    let mut rig = noon_rig();
    pump_schedule_8_to_20(&mut rig);
    rig.tick_at(0);
    assert!(rig.hw.output(PUMP));

    rig.set_switch(true);
    rig.advance(5000);
    assert_eq!(rig.app.state(), OperatingState::Manual);
    assert!(rig.hw.outputs().iter().all(|on| !on));

    // Operator commands cannot hold it out of manual.
    rig.update(r#"{"general":{"mode":"run_schedule"}}"#).unwrap();
    rig.advance(5000);
    assert_eq!(rig.app.state(), OperatingState::Manual);

    rig.set_switch(false);
    rig.advance(5000);
    assert_eq!(rig.app.state(), OperatingState::RunSchedule);
    assert!(rig.hw.output(PUMP));
}

#[test]
fn switch_reset_gesture_restores_defaults() {
    let mut rig = noon_rig();
    pump_schedule_8_to_20(&mut rig);
    rig.tick_at(0);

    for i in 0..6 {
        rig.set_switch(i % 2 == 0);
        rig.advance(500);
    }
    assert!(rig.sink.contains(&AppEvent::ConfigReset));
    assert!(rig.app.relays().get(PUMP).unwrap().schedule().is_empty());

    let saved = ConfigDocument::from_json(rig.store.document().unwrap()).unwrap();
    assert_eq!(saved, ConfigDocument::from_json(&rig.app.document().to_json().unwrap()).unwrap());
}

#[test]
fn reset_command_restores_defaults() {
    let mut rig = noon_rig();
    rig.update(r#"{"solar":{"enabled":"off"},"wifi":{"ssid":"home","pw":"secret"}}"#)
        .unwrap();
    assert_eq!(rig.app.wifi().ssid, "home");

    rig.command(AppCommand::ResetConfig).unwrap();
    assert_eq!(rig.app.solar_view().enabled, "on");
    assert_eq!(rig.app.wifi().ssid, "");
    assert_eq!(rig.app.wifi().tz_offset, -4);
}

// ── Solar ─────────────────────────────────────────────────────

fn solar_rig(water: f32, roof: f32) -> Rig {
    let mut rig = noon_rig();
    pump_schedule_8_to_20(&mut rig);
    rig.update(&format!(
        r#"{{"sensors":[{{"name":"{WATER_PROBE}","role":"water_temp"}},{{"name":"analog","role":"solar_roof_temp"}}]}}"#
    ))
    .unwrap();
    rig.hw.set_probe(WATER_PROBE, Some(water));
    rig.hw.analog = Some(roof);
    rig
}

#[test]
fn solar_opens_valve_when_roof_is_hot() {
    let mut rig = solar_rig(89.0, 92.0);
    rig.tick_at(0);

    assert_eq!(rig.app.solar_state(), SolarState::Heating);
    assert!(rig.hw.output(VALVE));
    assert_eq!(rig.app.relays().get(VALVE).unwrap().state(), RelayState::ManualOn);
    assert!(rig.sink.contains(&AppEvent::SolarChanged {
        from: SolarState::Bypass,
        to: SolarState::Heating,
    }));

    // Inside the dead band nothing changes.
    rig.hw.set_probe(WATER_PROBE, Some(90.5));
    rig.hw.analog = Some(86.0);
    rig.advance(5000);
    assert_eq!(rig.app.solar_state(), SolarState::Heating);

    // Water past target + 1 closes the valve.
    rig.hw.set_probe(WATER_PROBE, Some(91.5));
    rig.advance(5000);
    assert_eq!(rig.app.solar_state(), SolarState::Bypass);
    assert!(!rig.hw.output(VALVE));
}

#[test]
fn solar_is_disabled_without_pump_or_water_sensor() {
    let mut rig = solar_rig(80.0, 100.0);
    rig.update(r#"{"relays":[{"name":"pump","state":"off"}]}"#).unwrap();
    rig.tick_at(0);
    assert_eq!(rig.app.solar_state(), SolarState::Disabled);
    assert!(!rig.hw.output(VALVE));

    rig.update(r#"{"relays":[{"name":"pump","state":"on"}]}"#).unwrap();
    rig.hw.set_probe(WATER_PROBE, None);
    rig.advance(5000);
    assert_eq!(rig.app.solar_state(), SolarState::Disabled);
    assert!(rig.app.faults().contains(FaultCode::WaterSensorProblem));
}

#[test]
fn role_faults_track_sensor_presence() {
    let mut rig = solar_rig(80.0, 100.0);
    rig.tick_at(0);
    let status = rig.app.status(0);
    assert_eq!(status.pool_water_sensor_name.as_deref(), Some(WATER_PROBE));
    assert_eq!(status.roof_sensor_name.as_deref(), Some("analog"));
    assert_eq!(status.ambient_air_sensor_name, None);
    assert!(!rig.app.faults().contains(FaultCode::WaterSensorProblem));
    assert!(!rig.app.faults().contains(FaultCode::RoofSensorProblem));
    assert!(rig.app.faults().contains(FaultCode::AmbientSensorProblem));

    // A thermistor reading out of range counts as missing.
    rig.hw.analog = Some(400.0);
    rig.advance(5000);
    assert!(rig.app.faults().contains(FaultCode::RoofSensorProblem));
    let analog = rig
        .app
        .sensor_views()
        .into_iter()
        .find(|s| s.name == "analog")
        .unwrap();
    assert_eq!(analog.temp, None);
    assert_eq!(analog.role, "solar_roof_temp");
}
