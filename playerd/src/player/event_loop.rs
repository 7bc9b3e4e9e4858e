//! Engine event loop
//!
//! One dedicated thread per generation. It blocks in the engine's event wait,
//! translates raw events and forwards playback events to subscribers. When it
//! observes that the player is no longer Running it signals the closer over
//! the quit channel and exits; the closer destroys the engine handle only
//! after that.

use super::state::Shared;
use crate::engine::{event_id, EngineError};
use crate::error::Error;
use playerd_common::PlayerEvent;
use std::io;
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, trace, warn};

/// Pause between waits once the engine has shut itself down
const SHUTDOWN_BACKOFF: Duration = Duration::from_millis(50);

/// Map a raw event id to the event the core understands
pub(crate) fn translate(id: u32) -> Option<PlayerEvent> {
    match id {
        event_id::SET_PROPERTY_REPLY => Some(PlayerEvent::PropertySetReply),
        event_id::COMMAND_REPLY => Some(PlayerEvent::CommandReply),
        event_id::START_FILE => Some(PlayerEvent::StartFile),
        event_id::END_FILE => Some(PlayerEvent::EndFile),
        event_id::IDLE => Some(PlayerEvent::Idle),
        _ => None,
    }
}

pub(crate) struct EventLoop {
    generation: u64,
    shared: Arc<Shared>,
    events: broadcast::Sender<PlayerEvent>,
    quit: SyncSender<()>,
}

impl EventLoop {
    pub(crate) fn new(
        generation: u64,
        shared: Arc<Shared>,
        events: broadcast::Sender<PlayerEvent>,
        quit: SyncSender<()>,
    ) -> Self {
        Self {
            generation,
            shared,
            events,
            quit,
        }
    }

    pub(crate) fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("engine-events-{}", self.generation))
            .spawn(move || self.run())
    }

    fn run(self) {
        debug!("Event loop started (generation {})", self.generation);
        let mut engine_shut_down = false;

        loop {
            let raw = self.shared.wait_event();

            if raw.is_error() {
                let total = self.shared.record_fault();
                let fault = Error::EngineFault(EngineError::rejected(
                    raw.error,
                    format!("event {} (reply {})", raw.id, raw.reply_id),
                ));
                error!("{} ({} faults so far)", fault, total);
            }

            if !self.shared.is_running() {
                debug!("Event loop observed close (generation {})", self.generation);
                if self.quit.send(()).is_err() {
                    warn!(
                        "Close request vanished before quit signal (generation {})",
                        self.generation
                    );
                }
                break;
            }

            if raw.is_error() {
                continue;
            }

            match raw.id {
                event_id::NONE => {}
                event_id::SHUTDOWN => {
                    if !engine_shut_down {
                        warn!("Engine shut down on its own; waiting for close");
                        engine_shut_down = true;
                    }
                    thread::sleep(SHUTDOWN_BACKOFF);
                }
                id => match translate(id) {
                    Some(event) => self.handle(event),
                    None => trace!("Ignoring engine event {}", id),
                },
            }
        }

        debug!("Event loop exited (generation {})", self.generation);
    }

    fn handle(&self, event: PlayerEvent) {
        if event.is_acknowledgement() {
            trace!("Engine acknowledged submission: {}", event);
            return;
        }

        match event {
            PlayerEvent::StartFile => {
                self.shared.set_playing(true);
                debug!("Playback started");
            }
            PlayerEvent::EndFile => {
                self.shared.set_playing(false);
                debug!("Playback ended");
                // A paused player would stay paused on the next file
                if let Err(e) = self.shared.submit_property("pause", "no") {
                    warn!("Failed to clear pause after end of file: {}", e);
                }
            }
            PlayerEvent::Idle => debug!("Engine idle"),
            PlayerEvent::PropertySetReply | PlayerEvent::CommandReply => {}
        }

        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}
