//! # playerd
//!
//! Remote control daemon for a media engine:
//! - [`engine`]: capability traits over the engine, with libmpv and mock backends
//! - [`player`]: connection lifecycle, command dispatch and the event loop
//! - [`playback`]: higher-level playback operations
//! - [`api`]: HTTP control surface

pub mod api;
pub mod engine;
pub mod error;
pub mod playback;
pub mod player;

pub use error::{Error, ErrorKind, Result};
pub use playback::PlaybackService;
pub use player::Player;
pub use playerd_common::{PlayerEvent, PlayerStatus, RunningState};
