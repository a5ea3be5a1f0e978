//! Relay bank and manual-override reconciliation.
//!
//! Each relay carries a four-valued effective state.  `ManualOn` and
//! `ManualOff` remember that the last change came from an operator (or
//! the solar controller) rather than the schedule.  An override is only
//! cleared at the tick where the schedule's own verdict agrees with it:
//!
//! | current   | scheduled on | next      |
//! |-----------|--------------|-----------|
//! | ManualOn  | true         | On        |
//! | ManualOn  | false        | ManualOn  |
//! | ManualOff | false        | Off       |
//! | ManualOff | true         | ManualOff |
//! | On / Off  | true / false | On / Off  |

use log::{debug, info};

use crate::config::MAX_RELAYS;
use crate::schedule::{DailySchedule, TimeOfDay};

// ───────────────────────────────────────────────────────────────
// Relay state
// ───────────────────────────────────────────────────────────────

/// Effective state of one relay channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    On,
    #[default]
    Off,
    /// Switched on by override; holds until the schedule also says on.
    ManualOn,
    /// Switched off by override; holds until the schedule also says off.
    ManualOff,
}

impl RelayState {
    /// Display string reported to callers.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::ManualOn => "on (manual)",
            Self::ManualOff => "off (manual)",
        }
    }

    /// Whether the relay should be energised.
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On | Self::ManualOn)
    }

    pub const fn is_manual(self) -> bool {
        matches!(self, Self::ManualOn | Self::ManualOff)
    }

    /// Plain schedule-driven state.
    pub const fn scheduled(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }

    /// Override state recording an operator command.
    pub const fn manual(on: bool) -> Self {
        if on { Self::ManualOn } else { Self::ManualOff }
    }
}

/// Combine a relay's current state with the schedule's verdict.
pub const fn resolve(current: RelayState, scheduled_on: bool) -> RelayState {
    match (current, scheduled_on) {
        (RelayState::ManualOn, false) => RelayState::ManualOn,
        (RelayState::ManualOff, true) => RelayState::ManualOff,
        (_, on) => RelayState::scheduled(on),
    }
}

// ───────────────────────────────────────────────────────────────
// Relay channel
// ───────────────────────────────────────────────────────────────

/// One physical relay output and its schedule.
#[derive(Debug, Clone, Default)]
pub struct RelayChannel {
    index: usize,
    name: String,
    state: RelayState,
    schedule: DailySchedule,
}

impl RelayChannel {
    fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Physical output position.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn schedule(&self) -> &DailySchedule {
        &self.schedule
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name.clear();
        self.name.push_str(name);
    }

    pub(crate) fn set_schedule(&mut self, schedule: DailySchedule) {
        self.schedule = schedule;
    }
}

/// A state change on one channel, reported for event emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayChange {
    pub index: usize,
    pub from: RelayState,
    pub to: RelayState,
}

/// Changes produced by one pass over the bank.
pub type RelayChanges = heapless::Vec<RelayChange, MAX_RELAYS>;

// ───────────────────────────────────────────────────────────────
// Relay bank
// ───────────────────────────────────────────────────────────────

/// The fixed bank of relay channels.
#[derive(Debug, Clone)]
pub struct RelayBank {
    channels: [RelayChannel; MAX_RELAYS],
}

impl Default for RelayBank {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayBank {
    /// Unnamed channels, empty schedules, all off.
    pub fn new() -> Self {
        Self {
            channels: core::array::from_fn(RelayChannel::new),
        }
    }

    pub fn channels(&self) -> &[RelayChannel] {
        &self.channels
    }

    pub fn get(&self, index: usize) -> Option<&RelayChannel> {
        self.channels.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut RelayChannel> {
        self.channels.get_mut(index)
    }

    /// Index of the channel with this name.  Empty names never match.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.channels.iter().position(|c| c.name == name)
    }

    pub fn find(&self, name: &str) -> Option<&RelayChannel> {
        self.index_of(name).map(|i| &self.channels[i])
    }

    /// Set a channel state directly, bypassing reconciliation.
    /// Returns the change if the state actually moved.
    pub fn set_state(&mut self, index: usize, state: RelayState) -> Option<RelayChange> {
        let channel = self.channels.get_mut(index)?;
        let from = channel.state;
        channel.state = state;
        (from != state).then_some(RelayChange {
            index,
            from,
            to: state,
        })
    }

    /// Run every channel's schedule at `now` through [`resolve`].
    pub fn reconcile(&mut self, now: TimeOfDay) -> RelayChanges {
        let mut changes = RelayChanges::new();
        for channel in &mut self.channels {
            let scheduled_on = channel.schedule.is_active(now);
            let next = resolve(channel.state, scheduled_on);
            if next != channel.state {
                if channel.state.is_manual() && !next.is_manual() {
                    info!(
                        "Relay '{}': schedule caught up, override cleared ({})",
                        channel.name,
                        next.as_str()
                    );
                }
                let _ = changes.push(RelayChange {
                    index: channel.index,
                    from: channel.state,
                    to: next,
                });
                channel.state = next;
            }
        }
        changes
    }

    /// Force every channel to plain `Off`, dropping any override.
    pub fn force_all_off(&mut self) -> RelayChanges {
        let mut changes = RelayChanges::new();
        for channel in &mut self.channels {
            if channel.state != RelayState::Off {
                let _ = changes.push(RelayChange {
                    index: channel.index,
                    from: channel.state,
                    to: RelayState::Off,
                });
                channel.state = RelayState::Off;
            }
        }
        changes
    }

    /// Logical output levels in channel order (`true` = energise).
    pub fn outputs(&self) -> [bool; MAX_RELAYS] {
        let levels = core::array::from_fn(|i| self.channels[i].state.is_on());
        debug!("Relay outputs: {:?}", levels);
        levels
    }
}
