//! Concrete state handler functions and table builder.
//!
//! ```text
//!  UNINITIALIZED ──[first configuration]──▶ RUN_SCHEDULE
//!
//!  RUN_SCHEDULE ──[time stale]──▶ NO_RELIABLE_TIME ──[synced]──▶ RUN_SCHEDULE
//!
//!  any configured state ──[switch asserted]──▶ MANUAL ──[released]──▶ RUN_SCHEDULE
//!
//!  IDLE: entered and left only by operator command
//! ```
//!
//! The manual switch is checked first in every configured state.

use super::context::{ModeContext, RelayPolicy};
use super::{OperatingState, StateDescriptor};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; OperatingState::COUNT] {
    [
        // Index 0: Uninitialized
        StateDescriptor {
            id: OperatingState::Uninitialized,
            name: OperatingState::Uninitialized.as_str(),
            on_enter: Some(force_off_enter),
            on_exit: None,
            on_update: uninitialized_update,
        },
        // Index 1: Manual
        StateDescriptor {
            id: OperatingState::Manual,
            name: OperatingState::Manual.as_str(),
            on_enter: Some(manual_enter),
            on_exit: Some(manual_exit),
            on_update: manual_update,
        },
        // Index 2: RunSchedule
        StateDescriptor {
            id: OperatingState::RunSchedule,
            name: OperatingState::RunSchedule.as_str(),
            on_enter: Some(run_schedule_enter),
            on_exit: None,
            on_update: run_schedule_update,
        },
        // Index 3: Idle
        StateDescriptor {
            id: OperatingState::Idle,
            name: OperatingState::Idle.as_str(),
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 4: NoReliableTime
        StateDescriptor {
            id: OperatingState::NoReliableTime,
            name: OperatingState::NoReliableTime.as_str(),
            on_enter: Some(no_time_enter),
            on_exit: None,
            on_update: no_time_update,
        },
    ]
}

fn force_off_enter(ctx: &mut ModeContext) {
    ctx.relay_policy = RelayPolicy::ForceOff;
}

// ═══════════════════════════════════════════════════════════════════════════
//  UNINITIALIZED: waiting for the first configuration
// ═══════════════════════════════════════════════════════════════════════════

fn uninitialized_update(_ctx: &mut ModeContext) -> Option<OperatingState> {
    // Left only by the service once a configuration has been applied.
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  MANUAL: hardware switch asserted, everything off
// ═══════════════════════════════════════════════════════════════════════════

fn manual_enter(ctx: &mut ModeContext) {
    ctx.relay_policy = RelayPolicy::ForceOff;
    info!("MANUAL: mode switch asserted, relays off");
}

fn manual_exit(_ctx: &mut ModeContext) {
    info!("MANUAL: mode switch released, resuming schedule");
}

fn manual_update(ctx: &mut ModeContext) -> Option<OperatingState> {
    if !ctx.manual_switch {
        return Some(OperatingState::RunSchedule);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUN_SCHEDULE: relays follow their schedules
// ═══════════════════════════════════════════════════════════════════════════

fn run_schedule_enter(ctx: &mut ModeContext) {
    ctx.relay_policy = RelayPolicy::FollowSchedule;
    info!("RUN_SCHEDULE: relays following schedules");
}

fn run_schedule_update(ctx: &mut ModeContext) -> Option<OperatingState> {
    if ctx.manual_switch {
        return Some(OperatingState::Manual);
    }

    if ctx.time_stale {
        warn!("RUN_SCHEDULE: too long without a time sync, going idle until time is known");
        return Some(OperatingState::NoReliableTime);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE: operator-requested rest
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut ModeContext) {
    ctx.relay_policy = RelayPolicy::ForceOff;
    info!("IDLE: relays off by request");
}

fn idle_update(ctx: &mut ModeContext) -> Option<OperatingState> {
    if ctx.manual_switch {
        return Some(OperatingState::Manual);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  NO_RELIABLE_TIME: idle until the clock is trusted again
// ═══════════════════════════════════════════════════════════════════════════

fn no_time_enter(ctx: &mut ModeContext) {
    ctx.relay_policy = RelayPolicy::ForceOff;
    warn!("NO_RELIABLE_TIME: relays off");
}

fn no_time_update(ctx: &mut ModeContext) -> Option<OperatingState> {
    if ctx.manual_switch {
        return Some(OperatingState::Manual);
    }

    if !ctx.time_stale {
        info!("NO_RELIABLE_TIME: time is reliable again, resuming schedule");
        return Some(OperatingState::RunSchedule);
    }

    None
}
