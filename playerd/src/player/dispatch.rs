//! Command, option and property dispatch
//!
//! Each submission checks the Running State first and never blocks on the
//! engine's completion; results arrive later as reply events. The check is
//! repeated under the submission gate, which a beginning close waits on.

use super::state::Shared;
use super::Player;
use crate::engine::{EngineError, EngineHandle, OptionValue, ERROR_INVALID_PARAMETER};
use crate::error::{Error, Result};
use tracing::{debug, warn};

/// Apply one option to a handle, translating the engine's refusal
pub(crate) fn apply_option(
    handle: &dyn EngineHandle,
    name: &str,
    value: &OptionValue,
) -> Result<()> {
    debug!("Setting option {}={}", name, value);
    handle.set_option(name, value).map_err(|e| {
        Error::from_engine(e, |source| Error::OptionRejected {
            name: name.to_string(),
            source,
        })
    })
}

impl Shared {
    pub(crate) fn submit_command(&self, args: Vec<String>) -> Result<()> {
        self.ensure_running()?;

        let Some(command) = args.first().cloned() else {
            return Err(Error::CommandRejected {
                command: String::new(),
                source: EngineError::rejected(ERROR_INVALID_PARAMETER, "empty command"),
            });
        };

        let result = self.with_running_handle(|handle| {
            let reply_id = self.next_reply_id();
            debug!("Submitting command {:?} (reply {})", args, reply_id);
            handle.command_async(reply_id, &args).map_err(|e| {
                Error::from_engine(e, |source| Error::CommandRejected {
                    command: command.clone(),
                    source,
                })
            })
        });
        if let Err(e) = &result {
            warn!("{}", e);
        }
        result
    }

    pub(crate) fn submit_option(&self, name: &str, value: &OptionValue) -> Result<()> {
        self.ensure_running()?;

        let result = self.with_running_handle(|handle| apply_option(handle, name, value));
        if let Err(e) = &result {
            warn!("{}", e);
        }
        result
    }

    pub(crate) fn submit_property(&self, name: &str, value: &str) -> Result<()> {
        self.ensure_running()?;

        let result = self.with_running_handle(|handle| {
            let reply_id = self.next_reply_id();
            debug!("Submitting property {}={} (reply {})", name, value, reply_id);
            handle.set_property_async(reply_id, name, value).map_err(|e| {
                Error::from_engine(e, |source| Error::PropertyRejected {
                    name: name.to_string(),
                    source,
                })
            })
        });
        if let Err(e) = &result {
            warn!("{}", e);
        }
        result
    }
}

impl Player {
    /// Submit an engine command; the first argument names the command
    ///
    /// ```ignore
    /// player.set_command(["loadfile", "/media/clip.mp4"])?;
    /// ```
    pub fn set_command<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared.submit_command(args.into_iter().map(Into::into).collect())
    }

    /// Set a string option on the running engine
    pub fn set_option(&self, name: &str, value: &str) -> Result<()> {
        self.shared.submit_option(name, &OptionValue::Str(value.to_string()))
    }

    /// Set a boolean option on the running engine (sent as "yes"/"no")
    pub fn set_flag(&self, name: &str, value: bool) -> Result<()> {
        self.shared.submit_option(name, &OptionValue::Flag(value))
    }

    /// Write a property asynchronously
    pub fn set_property(&self, name: &str, value: &str) -> Result<()> {
        self.shared.submit_property(name, value)
    }
}
