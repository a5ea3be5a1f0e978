//! Pool controller decision core.
//!
//! Decides, once per tick, which of eight relay channels (pump, lights,
//! solar valve, ...) should be energised, from daily schedules, operator
//! overrides, a manual-mode switch, the reliability of the wall clock and a
//! solar heating hysteresis loop.  All hardware is reached through the port
//! traits in [`app::ports`]; the crate builds and tests on the host.

pub mod adapters;
pub mod app;
pub mod config;
pub mod document;
pub mod drivers;
pub mod error;
pub mod faults;
pub mod fsm;
pub mod relay;
pub mod schedule;
pub mod sensors;
pub mod solar;
pub mod time_sync;
