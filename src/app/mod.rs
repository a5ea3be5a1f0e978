//! Application core: pure domain logic, zero I/O.
//!
//! The [`service::PoolController`] runs the tick and applies configuration.
//! All interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
