//! Active fault list.
//!
//! A capacity-bounded, deduplicated set of fault codes that are currently
//! true.  It is a status display, not an audit log: raising a code that is
//! already present, or raising anything once the set is full, does nothing.
//!
//! ## Fault lifecycle
//!
//! 1. A condition is detected (e.g. the water sensor vanished from the bus).
//! 2. The owner calls [`FaultSet::raise`] (or [`FaultSet::eval`] with the
//!    condition) and the code joins the set.
//! 3. Every tick the condition is re-evaluated; once it clears, the code
//!    is removed.

use core::fmt;

use log::{debug, error, info};

use crate::config::MAX_FAULTS;

/// Every runtime or configuration fault the controller reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultCode {
    /// The time source could not be reached or did not reply.
    NoTimeSource,
    /// No network route to the time source.
    NoNetwork,
    /// The sensor holding the roof role is missing.
    RoofSensorProblem,
    /// The sensor holding the ambient-air role is missing.
    AmbientSensorProblem,
    /// The sensor holding the water role is missing.
    WaterSensorProblem,
    /// The stored configuration could not be applied.
    MalformedConfig,
}

impl FaultCode {
    /// Display string reported to callers.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoTimeSource => "no NTP time",
            Self::NoNetwork => "no wifi",
            Self::RoofSensorProblem => "roof (solar) temp sensor problem",
            Self::AmbientSensorProblem => "ambient air temp sensor problem",
            Self::WaterSensorProblem => "pool water temp sensor problem",
            Self::MalformedConfig => "malformed configuration",
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded set of active faults.
#[derive(Debug, Clone, Default)]
pub struct FaultSet<const N: usize = MAX_FAULTS> {
    active: heapless::Vec<FaultCode, N>,
}

impl<const N: usize> FaultSet<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `code`.  Returns `true` only if it was newly added.
    pub fn raise(&mut self, code: FaultCode) -> bool {
        if self.contains(code) {
            return false;
        }
        if self.active.push(code).is_err() {
            debug!("Fault list full, dropping {code}");
            return false;
        }
        error!("FAULT SET: {code}");
        true
    }

    /// Remove `code`.  Returns `true` only if it was present.
    pub fn clear(&mut self, code: FaultCode) -> bool {
        match self.active.iter().position(|c| *c == code) {
            Some(pos) => {
                self.active.remove(pos);
                info!("FAULT CLEARED: {code}");
                true
            }
            None => false,
        }
    }

    /// Raise or clear `code` depending on `condition`.
    /// Returns `Some(true)` if raised, `Some(false)` if cleared, `None` if unchanged.
    pub fn eval(&mut self, code: FaultCode, condition: bool) -> Option<bool> {
        let changed = if condition {
            self.raise(code)
        } else {
            self.clear(code)
        };
        changed.then_some(condition)
    }

    pub fn contains(&self, code: FaultCode) -> bool {
        self.active.contains(&code)
    }

    pub fn iter(&self) -> impl Iterator<Item = FaultCode> + '_ {
        self.active.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
