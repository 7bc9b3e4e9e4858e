//! Player event types and status snapshots
//!
//! `PlayerEvent` is the closed set of engine notifications the daemon cares
//! about. Events are produced by the engine event loop and forwarded to
//! subscribers (SSE clients, the playback service).

use serde::{Deserialize, Serialize};

/// Domain events delivered by the engine event loop
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Acknowledgement of an asynchronous property write
    PropertySetReply,

    /// Acknowledgement of an asynchronous command
    CommandReply,

    /// A file started loading; playback is about to begin
    StartFile,

    /// Playback of the current file ended (finished, stopped or replaced)
    EndFile,

    /// The engine entered idle mode (nothing loaded)
    Idle,
}

impl PlayerEvent {
    /// Stable event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::PropertySetReply => "PropertySetReply",
            PlayerEvent::CommandReply => "CommandReply",
            PlayerEvent::StartFile => "StartFile",
            PlayerEvent::EndFile => "EndFile",
            PlayerEvent::Idle => "Idle",
        }
    }

    /// True for bare acknowledgements that carry no playback information
    pub fn is_acknowledgement(&self) -> bool {
        matches!(self, PlayerEvent::PropertySetReply | PlayerEvent::CommandReply)
    }
}

impl std::fmt::Display for PlayerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_type())
    }
}

/// Engine connection lifecycle state
///
/// `Closing` only exists while a close request waits for the event loop to
/// exit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunningState {
    #[default]
    Closed,
    Running,
    Closing,
}

impl std::fmt::Display for RunningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunningState::Closed => write!(f, "closed"),
            RunningState::Running => write!(f, "running"),
            RunningState::Closing => write!(f, "closing"),
        }
    }
}

/// Point-in-time view of the player for status endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerStatus {
    /// Lifecycle state of the engine connection
    pub state: RunningState,

    /// Whether media is currently playing
    pub playing: bool,

    /// Number of open generations since startup (0 = never opened)
    pub generation: u64,

    /// Errors reported by the engine event wait since startup
    pub engine_faults: u64,
}
