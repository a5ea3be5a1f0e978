//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements  | Connects to                 |
//! |----------------|-------------|-----------------------------|
//! | `config_store` | ConfigPort  | In-memory or JSON file      |
//! | `log_sink`     | EventSink   | `log` facade                |
//!
//! Hardware ports (probe bus, relay driver, time client) are implemented by
//! the board support crate.  The manual-mode switch port is implemented by
//! [`crate::drivers::mode_switch::DebouncedSwitch`].

pub mod config_store;
pub mod log_sink;
