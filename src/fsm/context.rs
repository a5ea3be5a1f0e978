//! Shared context threaded through every mode-machine handler.
//!
//! The service fills in the inputs before each tick; handlers read them to
//! decide transitions and write the relay policy that the service then
//! applies to the relay bank.

// ---------------------------------------------------------------------------
// Relay policy (written by state handlers; consumed by the service)
// ---------------------------------------------------------------------------

/// How the relay bank is driven while in a given mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayPolicy {
    /// Every relay is forced to plain `Off` each tick.
    #[default]
    ForceOff,
    /// Relays follow their schedules through reconciliation.
    FollowSchedule,
}

// ---------------------------------------------------------------------------
// ModeContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
#[derive(Debug, Clone, Default)]
pub struct ModeContext {
    // -- Inputs --
    /// Debounced manual-mode switch level (`true` = manual requested).
    pub manual_switch: bool,
    /// The clock has gone too long without a successful sync.
    pub time_stale: bool,

    // -- Outputs --
    /// Relay policy for the current mode.
    pub relay_policy: RelayPolicy,
}

impl ModeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether relays should follow their schedules.
    pub fn follows_schedule(&self) -> bool {
        self.relay_policy == RelayPolicy::FollowSchedule
    }
}
