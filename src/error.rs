//! Error types for the pool controller core.
//!
//! Configuration errors are returned to the caller and leave the controller
//! untouched.  Runtime problems (no time source, missing sensors) are never
//! returned as errors; they are recorded in the fault list instead, see
//! [`crate::faults`].

use core::fmt;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Reasons a configuration update is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A time literal is not `HH:MM:SS` with in-range fields.
    InvalidTime,
    /// An interval's off time is equal to or earlier than its on time.
    OffNotAfterOn,
    /// Two intervals of the same schedule overlap.
    Overlap,
    /// A schedule holds more intervals than a relay supports.
    TooManyIntervals,
    /// A relay descriptor has no name.
    MissingRelayName,
    /// A relay descriptor names no known relay.
    UnknownRelay(String),
    /// Two relays would end up with the same name.
    DuplicateRelayName(String),
    /// More relay descriptors than physical channels.
    TooManyRelays,
    /// A relay state token is neither `on` nor `off`.
    InvalidRelayState,
    /// The solar `enabled` token is neither `on` nor `off`.
    InvalidEnabled,
    /// The solar target lies outside the accepted range.
    TargetOutOfRange,
    /// A sensor role token is not recognised.
    InvalidRole,
    /// The same named role was given to more than one sensor.
    DuplicateRole,
    /// Two sensor descriptors share a name.
    DuplicateSensorName,
    /// More sensor descriptors than can be tracked.
    TooManySensors,
    /// Requested operating mode cannot be set by command.
    InvalidMode,
    /// The document could not be parsed at all.
    Malformed,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTime => {
                write!(f, "invalid time string (must be HH:MM:SS 24 hour format)")
            }
            Self::OffNotAfterOn => write!(f, "off-time cannot be the same as or before on-time"),
            Self::Overlap => write!(f, "time ranges can not overlap"),
            Self::TooManyIntervals => write!(f, "too many on/off times for one relay"),
            Self::MissingRelayName => write!(f, "missing \"name\" field for relay"),
            Self::UnknownRelay(name) => {
                write!(f, "relay name \"{name}\" doesn't match any known relay")
            }
            Self::DuplicateRelayName(name) => write!(f, "relay name \"{name}\" is used twice"),
            Self::TooManyRelays => write!(f, "too many relays specified"),
            Self::InvalidRelayState => {
                write!(f, "invalid \"state\" provided, must be \"on\" or \"off\"")
            }
            Self::InvalidEnabled => {
                write!(f, "invalid \"enabled\" provided, must be \"on\" or \"off\"")
            }
            Self::TargetOutOfRange => write!(f, "target temperature is outside the valid range"),
            Self::InvalidRole => write!(f, "unknown sensor role"),
            Self::DuplicateRole => write!(f, "a sensor role can only be assigned once"),
            Self::DuplicateSensorName => write!(f, "sensor names must be unique"),
            Self::TooManySensors => write!(f, "too many temperature sensors"),
            Self::InvalidMode => {
                write!(f, "invalid pool mode (only 'run_schedule' and 'idle' accepted)")
            }
            Self::Malformed => write!(f, "configuration document is malformed"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Time sync errors
// ---------------------------------------------------------------------------

/// Why a time-source exchange failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// The time server could not be resolved or reached.
    NoRoute,
    /// No reply arrived within the bounded wait.
    Timeout,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRoute => write!(f, "no route to time server"),
            Self::Timeout => write!(f, "time server did not reply"),
        }
    }
}

impl std::error::Error for SyncError {}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

/// Errors from the configuration store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No stored document (first boot).
    NotFound,
    /// Underlying storage failed.
    IoError,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for StorageError {}
