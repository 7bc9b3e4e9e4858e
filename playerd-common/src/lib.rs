//! # playerd common library
//!
//! Shared code for the playerd daemon and its tooling:
//! - Error type for bootstrap concerns
//! - Bootstrap configuration (TOML file + resolution order)
//! - Domain events and status snapshots exposed to API clients

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{PlayerEvent, PlayerStatus, RunningState};
