//! Function-pointer finite state machine for the operating mode.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌────────────────┬───────────┬──────────┬─────────────────┐  │
//! │  │ OperatingState │ on_enter  │ on_exit  │ on_update       │  │
//! │  ├────────────────┼───────────┼──────────┼─────────────────┤  │
//! │  │ Uninitialized  │ fn(ctx)   │ -        │ fn(ctx)->Option │  │
//! │  │ Manual         │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option │  │
//! │  │ RunSchedule    │ fn(ctx)   │ -        │ fn(ctx)->Option │  │
//! │  │ Idle           │ fn(ctx)   │ -        │ fn(ctx)->Option │  │
//! │  │ NoReliableTime │ fn(ctx)   │ -        │ fn(ctx)->Option │  │
//! │  └────────────────┴───────────┴──────────┴─────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  All functions receive `&mut ModeContext`.

pub mod context;
pub mod states;

use core::fmt;

use context::ModeContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Top-level operating mode.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum OperatingState {
    /// No configuration applied yet; the control loop does nothing.
    #[default]
    Uninitialized = 0,
    /// Hardware mode switch asserted; all relays off.
    Manual = 1,
    RunSchedule = 2,
    /// Operator-requested rest; all relays off.
    Idle = 3,
    /// Clock too stale to trust; all relays off until a sync succeeds.
    NoReliableTime = 4,
}

impl OperatingState {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 5;

    /// Convert an index back to a state.  Out-of-range indices fall back to
    /// `Uninitialized`, which drives nothing.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Uninitialized,
            1 => Self::Manual,
            2 => Self::RunSchedule,
            3 => Self::Idle,
            4 => Self::NoReliableTime,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Uninitialized
            }
        }
    }

    /// Mode name reported to callers.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Manual => "manual_operation",
            Self::RunSchedule => "run_schedule",
            Self::Idle => "idle",
            Self::NoReliableTime => "idle (no reliable time source)",
        }
    }
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut ModeContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut ModeContext) -> Option<OperatingState>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single state.
pub struct StateDescriptor {
    pub id: OperatingState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The operating-mode engine.
pub struct Fsm {
    /// Fixed-size table indexed by `OperatingState as usize`.
    table: [StateDescriptor; OperatingState::COUNT],
    /// Index of the currently active state.
    current: usize,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; OperatingState::COUNT], initial: OperatingState) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut ModeContext) {
        info!("Mode machine starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance by one tick.  Returns the transition taken, if any.
    pub fn tick(&mut self, ctx: &mut ModeContext) -> Option<(OperatingState, OperatingState)> {
        let from = self.current_state();
        let next = (self.table[self.current].on_update)(ctx)?;
        self.force_transition(next, ctx).then_some((from, next))
    }

    /// Transition immediately (operator command or first configuration).
    /// Returns `true` if the state changed.
    pub fn force_transition(&mut self, next: OperatingState, ctx: &mut ModeContext) -> bool {
        if next as usize == self.current {
            return false;
        }
        self.transition(next, ctx);
        true
    }

    /// The current state's identity.
    pub fn current_state(&self) -> OperatingState {
        OperatingState::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: OperatingState, ctx: &mut ModeContext) {
        let next_idx = next_id as usize;

        info!(
            "Mode transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

impl Default for Fsm {
    fn default() -> Self {
        Self::new(states::build_state_table(), OperatingState::Uninitialized)
    }
}
