//! Outbound application events.
//!
//! The [`PoolController`](super::service::PoolController) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them.

use chrono::{DateTime, Utc};

use crate::error::{ConfigError, SyncError};
use crate::faults::FaultCode;
use crate::fsm::OperatingState;
use crate::relay::RelayState;
use crate::solar::SolarState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller has started (carries the initial mode).
    Started(OperatingState),

    /// The operating mode changed.
    ModeChanged {
        from: OperatingState,
        to: OperatingState,
    },

    /// A relay's effective state changed.
    RelayChanged {
        index: usize,
        name: String,
        from: RelayState,
        to: RelayState,
    },

    /// The solar controller changed state.
    SolarChanged { from: SolarState, to: SolarState },

    FaultRaised(FaultCode),
    FaultCleared(FaultCode),

    /// The clock was set from the time source or by the operator.
    TimeSynced(DateTime<Utc>),

    /// A time-source exchange failed.
    TimeSyncFailed(SyncError),

    /// A configuration document was applied.
    ConfigApplied,

    /// A configuration document was rejected; nothing changed.
    ConfigRejected(ConfigError),

    /// The configuration was reset to factory defaults.
    ConfigReset,
}
