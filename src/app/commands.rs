//! Inbound commands to the application service.
//!
//! These represent actions requested by the operator API that the
//! [`PoolController`](super::service::PoolController) validates and applies
//! between ticks.

use crate::document::ConfigDocument;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Apply a (possibly partial) configuration update.  Relay states in
    /// the document become manual overrides.
    UpdateConfig(ConfigDocument),

    /// Discard the configuration and restore factory defaults.
    ResetConfig,

    /// Persist the current configuration immediately.
    SaveConfig,
}
