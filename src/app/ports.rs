//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PoolController (domain)
//! ```
//!
//! Driven adapters (probe bus, relay shift register, mode switch, time
//! source, config store, event sinks) implement these traits.  The
//! [`PoolController`](super::service::PoolController) consumes them via
//! generics, so the decision core never touches hardware directly.

use chrono::{DateTime, Utc};

use crate::drivers::mode_switch::SwitchEvent;
use crate::error::{StorageError, SyncError};
use crate::sensors::ProbeReading;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for temperature hardware.
pub trait SensorPort {
    /// Scan the one-wire bus.  Unreadable probes carry a `None` reading.
    fn scan_temperature_probes(&mut self) -> Vec<ProbeReading>;

    /// Read the analog thermistor in degrees, `None` if disconnected.
    fn read_analog_thermistor(&mut self) -> Option<f32>;
}

// ───────────────────────────────────────────────────────────────
// Relay output port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the relay bank.
pub trait RelayOutputPort {
    /// Drive every channel in order.  `true` means energised; any
    /// active-low inversion happens inside the adapter.
    fn set_relay_outputs(&mut self, levels: &[bool]);
}

// ───────────────────────────────────────────────────────────────
// Mode switch port
// ───────────────────────────────────────────────────────────────

/// Debounced manual-mode switch.  Sampled on every controller call.
pub trait ModeSwitchPort {
    /// Poll the switch.  Returns an event when the debounced level changes
    /// or a reset gesture completes.
    fn sample_switch(&mut self, now_ms: u64) -> Option<SwitchEvent>;

    /// Debounced level: `true` while manual mode is requested.
    fn switch_asserted(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Time source port
// ───────────────────────────────────────────────────────────────

/// Network time exchange.  Blocks for at most `timeout_ms`.
pub trait TimeSourcePort {
    fn sync_time(&mut self, server: &str, timeout_ms: u64) -> Result<DateTime<Utc>, SyncError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the configuration document as JSON text.
///
/// The store is opaque: validation happens in the domain, so a corrupt or
/// hand-edited document is detected on load rather than by the store.
pub trait ConfigPort {
    /// Return the stored document, or [`StorageError::NotFound`] on first boot.
    fn load(&self) -> Result<String, StorageError>;

    /// Replace the stored document.
    fn save(&mut self, document: &str) -> Result<(), StorageError>;
}
