//! Peripheral drivers over `embedded-hal` traits.

pub mod mode_switch;
