//! Engine abstraction
//!
//! The rendering engine itself is external. This module defines the narrow
//! capability interface the player core drives it through:
//!
//! - [`Engine`] creates connections ([`EngineHandle`]s)
//! - [`EngineHandle`] is one live connection; dropping it destroys the
//!   connection
//!
//! Backends:
//! - `libmpv` (feature `libmpv`): FFI to libmpv's client API
//! - [`mock`]: in-process scripted engine for tests and builds without libmpv
//!
//! # Thread safety
//!
//! Handles are `Send + Sync`. Any thread may submit commands, options and
//! properties or call [`EngineHandle::wakeup`], but only one thread at a time
//! may block in [`EngineHandle::wait_event`].

#[cfg(feature = "libmpv")]
pub mod libmpv;
pub mod mock;

use thiserror::Error;

/// Engine error code for an invalid parameter (mirrors `MPV_ERROR_INVALID_PARAMETER`)
pub const ERROR_INVALID_PARAMETER: i32 = -4;

/// Engine error code for an out-of-memory condition (mirrors `MPV_ERROR_NOMEM`)
pub const ERROR_NOMEM: i32 = -2;

/// Raw event identifiers delivered by the engine
///
/// Numeric values follow libmpv's stable `mpv_event_id` ABI.
pub mod event_id {
    pub const NONE: u32 = 0;
    pub const SHUTDOWN: u32 = 1;
    pub const SET_PROPERTY_REPLY: u32 = 4;
    pub const COMMAND_REPLY: u32 = 5;
    pub const START_FILE: u32 = 6;
    pub const END_FILE: u32 = 7;
    pub const IDLE: u32 = 11;
}

/// Failure reported by an engine call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine refused the call
    #[error("{message} (code {code})")]
    Rejected { code: i32, message: String },

    /// Arguments could not be marshalled for the engine
    #[error("allocation failed: {0}")]
    Allocation(String),
}

impl EngineError {
    /// Convenience constructor for engine rejections
    pub fn rejected(code: i32, message: impl Into<String>) -> Self {
        EngineError::Rejected {
            code,
            message: message.into(),
        }
    }
}

/// Value of a startup or runtime option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Flag(bool),
    Str(String),
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionValue::Flag(true) => write!(f, "yes"),
            OptionValue::Flag(false) => write!(f, "no"),
            OptionValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Event as returned by [`EngineHandle::wait_event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// One of the [`event_id`] constants (or an id the core does not know)
    pub id: u32,

    /// Negative engine error code, 0 on success
    pub error: i32,

    /// Reply id passed with the originating async call (0 for unsolicited events)
    pub reply_id: u64,
}

impl RawEvent {
    /// Event returned on wakeup or timeout
    pub fn none() -> Self {
        Self::new(event_id::NONE)
    }

    pub fn new(id: u32) -> Self {
        Self {
            id,
            error: 0,
            reply_id: 0,
        }
    }

    /// Event carrying an engine error code
    pub fn error(id: u32, code: i32) -> Self {
        Self {
            id,
            error: code,
            reply_id: 0,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error < 0
    }
}

/// Factory for engine connections
pub trait Engine: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Create a new, uninitialized connection
    fn create(&self) -> Result<Box<dyn EngineHandle>, EngineError>;
}

/// One live connection to the engine
///
/// Dropping the handle tears the connection down. The owner must make sure
/// no thread is blocked in [`EngineHandle::wait_event`] at that point.
pub trait EngineHandle: Send + Sync {
    /// Set an option (before or after initialization)
    fn set_option(&self, name: &str, value: &OptionValue) -> Result<(), EngineError>;

    /// Initialize the connection after startup options are applied
    fn initialize(&self) -> Result<(), EngineError>;

    /// Submit a command without waiting for it to run
    fn command_async(&self, reply_id: u64, args: &[String]) -> Result<(), EngineError>;

    /// Submit a string property write without waiting for it to apply
    fn set_property_async(&self, reply_id: u64, name: &str, value: &str) -> Result<(), EngineError>;

    /// Block until the next event. A negative timeout waits forever.
    ///
    /// Returns an event with id [`event_id::NONE`] on wakeup or timeout.
    fn wait_event(&self, timeout: f64) -> RawEvent;

    /// Force a concurrent (or the next) `wait_event` to return
    fn wakeup(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_value_display() {
        assert_eq!(OptionValue::Flag(true).to_string(), "yes");
        assert_eq!(OptionValue::Flag(false).to_string(), "no");
        assert_eq!(OptionValue::Str("vdpau".into()).to_string(), "vdpau");
    }

    #[test]
    fn test_raw_event_error() {
        assert!(!RawEvent::none().is_error());
        assert!(RawEvent::error(event_id::NONE, -13).is_error());
    }
}
