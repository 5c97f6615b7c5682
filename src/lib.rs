//! # remeha-home - Remeha Home cloud integration
//!
//! Polls a Remeha / BDR Thermea boiler through the vendor's cloud API and
//! mirrors it onto a home-automation host: room, outdoor and hot-water
//! temperatures, water pressure, setpoint, zone mode and heating energy.
//! Setpoint and zone-mode changes from the host are written back.
//!
//! ## Architecture
//!
//! - `auth`: PKCE login against the vendor's B2C tenant and token caching
//! - `sync`: dashboard and energy reads, slot mapping, control writes
//! - `host`: the host's device registry (`DeviceHost`) and an in-memory host
//! - `plugin`: lifecycle, heartbeat and command handling
//! - `config`: YAML configuration with validation
//! - `logging`: structured logging and tracing
//! - `clock`: time source for token expiry and energy windows

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod plugin;
pub mod sync;

// Re-export commonly used types
pub use auth::{AuthSession, Credentials, is_token_valid};
pub use config::Config;
pub use error::{RemehaError, Result};
pub use host::{DeviceHost, MemoryHost, Slot, SlotValue};
pub use plugin::{CycleReport, HostCommand, RemehaPlugin};
pub use sync::{ApplianceSnapshot, DeviceSync, EnergyAggregate, MeterReading, ZoneMode};
