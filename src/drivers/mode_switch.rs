//! Debounced manual-mode switch with a reset gesture.
//!
//! ## Hardware
//!
//! A latching toggle switch on any [`InputPin`].  The pin is polled on every
//! controller invocation (not just full ticks), and a new level is accepted
//! only once it has held for the debounce window.
//!
//! ## Gesture detection
//!
//! | Gesture | Condition                                   | Event            |
//! |---------|---------------------------------------------|------------------|
//! | Toggle  | Stable level change                         | `Toggled(level)` |
//! | Reset   | `reset_flips` stable changes inside window  | `ResetGesture`   |

use embedded_hal::digital::InputPin;
use log::{debug, warn};

use crate::app::ports::ModeSwitchPort;
use crate::config::ControllerConfig;

/// Most flips the gesture window can remember.
const MAX_TRACKED_FLIPS: usize = 16;

/// Events emitted after debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchEvent {
    /// The debounced level changed; `true` means manual mode requested.
    Toggled(bool),
    /// The switch was flipped rapidly enough to request a configuration reset.
    ResetGesture,
}

/// Raw level not yet accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    level: bool,
    since_ms: u64,
}

pub struct DebouncedSwitch<P> {
    pin: P,
    /// Pin level that means "manual mode".
    active_high: bool,
    stable: bool,
    candidate: Option<Candidate>,
    flips: heapless::Deque<u64, MAX_TRACKED_FLIPS>,
    debounce_ms: u64,
    reset_flips: usize,
    reset_window_ms: u64,
}

impl<P: InputPin> DebouncedSwitch<P> {
    /// Wrap `pin`.  `active_high` selects which level asserts manual mode.
    /// The switch starts de-asserted.
    pub fn new(pin: P, active_high: bool, config: &ControllerConfig) -> Self {
        Self {
            pin,
            active_high,
            stable: false,
            candidate: None,
            flips: heapless::Deque::new(),
            debounce_ms: u64::from(config.switch_debounce_ms),
            reset_flips: usize::from(config.reset_switch_flips).clamp(1, MAX_TRACKED_FLIPS),
            reset_window_ms: u64::from(config.reset_window_ms),
        }
    }

    /// Debounced level: `true` while manual mode is requested.
    pub fn is_asserted(&self) -> bool {
        self.stable
    }

    /// Poll the pin.  A read error keeps the last stable level.
    pub fn sample(&mut self, now_ms: u64) -> Option<SwitchEvent> {
        let raw = match self.pin.is_high() {
            Ok(high) => high == self.active_high,
            Err(e) => {
                warn!("Mode switch read failed: {e:?}");
                return None;
            }
        };

        if raw == self.stable {
            self.candidate = None;
            return None;
        }

        match self.candidate {
            Some(c) if c.level == raw => {
                if now_ms.saturating_sub(c.since_ms) < self.debounce_ms {
                    return None;
                }
            }
            _ => {
                self.candidate = Some(Candidate {
                    level: raw,
                    since_ms: now_ms,
                });
                return None;
            }
        }

        self.candidate = None;
        self.stable = raw;
        debug!("Mode switch now {}", if raw { "manual" } else { "auto" });

        if self.record_flip(now_ms) {
            Some(SwitchEvent::ResetGesture)
        } else {
            Some(SwitchEvent::Toggled(raw))
        }
    }

    /// Remember one stable change; `true` once enough landed in the window.
    fn record_flip(&mut self, now_ms: u64) -> bool {
        while let Some(&oldest) = self.flips.front() {
            if now_ms.saturating_sub(oldest) > self.reset_window_ms {
                self.flips.pop_front();
            } else {
                break;
            }
        }
        if self.flips.is_full() {
            self.flips.pop_front();
        }
        let _ = self.flips.push_back(now_ms);

        if self.flips.len() >= self.reset_flips {
            warn!(
                "Mode switch flipped {} times in {} ms, reset requested",
                self.flips.len(),
                self.reset_window_ms
            );
            self.flips.clear();
            return true;
        }
        false
    }
}

impl<P: InputPin> ModeSwitchPort for DebouncedSwitch<P> {
    fn sample_switch(&mut self, now_ms: u64) -> Option<SwitchEvent> {
        self.sample(now_ms)
    }

    fn switch_asserted(&self) -> bool {
        self.is_asserted()
    }
}
