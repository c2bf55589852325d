//! Core bootstrap + lifecycle logic for the Anjani bot.
//!
//! This crate is intentionally framework-agnostic. The Telegram client and the data
//! store live behind ports (traits) implemented in adapter crates.

pub mod client;
pub mod config;
pub mod domain;
pub mod errors;
pub mod identity;
pub mod language;
pub mod lifecycle;
pub mod logging;
pub mod messaging;
pub mod plugin;
pub mod redact;
pub mod state;
pub mod store;

pub use errors::{Error, Result};
