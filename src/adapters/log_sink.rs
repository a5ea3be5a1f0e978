//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events through
//! the `log` facade.  The host chooses the logger backend.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={state}");
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE | {from} -> {to}");
            }
            AppEvent::RelayChanged {
                index,
                name,
                from,
                to,
            } => {
                info!(
                    "RELAY | #{index} '{name}' {} -> {}",
                    from.as_str(),
                    to.as_str()
                );
            }
            AppEvent::SolarChanged { from, to } => {
                info!("SOLAR | {from} -> {to}");
            }
            AppEvent::FaultRaised(code) => {
                warn!("FAULT | raised: {code}");
            }
            AppEvent::FaultCleared(code) => {
                info!("FAULT | cleared: {code}");
            }
            AppEvent::TimeSynced(utc) => {
                info!("TIME | synced, utc={}", utc.to_rfc3339());
            }
            AppEvent::TimeSyncFailed(e) => {
                warn!("TIME | sync failed: {e}");
            }
            AppEvent::ConfigApplied => {
                info!("CONFIG | applied");
            }
            AppEvent::ConfigRejected(e) => {
                warn!("CONFIG | rejected: {e}");
            }
            AppEvent::ConfigReset => {
                warn!("CONFIG | reset to factory defaults");
            }
        }
    }
}
