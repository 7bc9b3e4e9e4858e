//! Player core
//!
//! [`Player`] owns one engine connection at a time and runs its lifecycle:
//!
//! ```text
//! Closed --open--> Running --close--> Closing --(loop exited)--> Closed
//! ```
//!
//! **Open** creates the handle, applies flags then options, initializes the
//! engine and spawns the event loop. Any failure on the way destroys the
//! half-built handle and returns to Closed.
//!
//! **Close** flips the state to Closing once in-flight submissions have
//! returned, wakes the event loop, waits for its quit signal, joins the
//! thread and only then destroys the handle. The event loop is the only
//! thread that blocks in the engine, so the handle is never destroyed under
//! a waiter.
//!
//! Open and close are serialized by the lifecycle lock. Submissions take the
//! short state lock and the read side of the submission gate.

mod dispatch;
mod event_loop;
mod state;

use crate::engine::{Engine, OptionValue};
use crate::error::{Error, Result};
use event_loop::EventLoop;
use playerd_common::{PlayerEvent, PlayerStatus, RunningState};
use state::Shared;
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Buffered events per subscriber before it starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Resources of one open engine connection
struct Generation {
    id: u64,
    quit: Receiver<()>,
    thread: JoinHandle<()>,
}

/// Lifecycle controller and command surface for one engine
pub struct Player {
    engine: Arc<dyn Engine>,
    shared: Arc<Shared>,
    lifecycle: Mutex<Option<Generation>>,
}

impl Player {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            shared: Arc::new(Shared::new()),
            lifecycle: Mutex::new(None),
        }
    }

    /// Backend name, for logs
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Open the engine connection
    ///
    /// Flags are applied before options; both before the engine is
    /// initialized. Fails with `AlreadyRunning` unless the player is Closed.
    pub fn open(
        &self,
        flags: &BTreeMap<String, bool>,
        options: &BTreeMap<String, String>,
    ) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);

        if let Err(current) = self.shared.transition(RunningState::Closed, RunningState::Running) {
            warn!("Open rejected: player is {}", current);
            return Err(Error::AlreadyRunning);
        }

        let id = self.shared.next_generation();
        info!("Opening {} engine (generation {})", self.engine.name(), id);

        match self.start(id, flags, options) {
            Ok(generation) => {
                *lifecycle = Some(generation);
                info!("Engine running (generation {})", id);
                Ok(())
            }
            Err(e) => {
                error!("Failed to open engine (generation {}): {}", id, e);
                self.abort_open();
                Err(e)
            }
        }
    }

    fn start(
        &self,
        id: u64,
        flags: &BTreeMap<String, bool>,
        options: &BTreeMap<String, String>,
    ) -> Result<Generation> {
        let handle = self
            .engine
            .create()
            .map_err(|e| Error::InitializationFailed(e.to_string()))?;

        // On any early return below, dropping `handle` destroys the connection
        for (name, value) in flags {
            dispatch::apply_option(&*handle, name, &OptionValue::Flag(*value))?;
        }
        for (name, value) in options {
            dispatch::apply_option(&*handle, name, &OptionValue::Str(value.clone()))?;
        }

        handle
            .initialize()
            .map_err(|e| Error::InitializationFailed(e.to_string()))?;

        self.shared.set_playing(false);
        self.shared.install_handle(handle);

        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        self.shared.install_events(events_tx.clone());

        let (quit_tx, quit_rx) = mpsc::sync_channel(1);
        let thread = EventLoop::new(id, Arc::clone(&self.shared), events_tx, quit_tx)
            .spawn()
            .map_err(|e| {
                Error::InitializationFailed(format!("failed to spawn event loop: {}", e))
            })?;

        Ok(Generation {
            id,
            quit: quit_rx,
            thread,
        })
    }

    /// Undo a partial open; no event loop is running at this point
    fn abort_open(&self) {
        self.shared.take_events();
        if self.shared.take_handle().is_some() {
            debug!("Destroyed partially opened engine handle");
        }
        self.shared.set_playing(false);
        self.shared.set_state(RunningState::Closed);
    }

    /// Close the engine connection
    ///
    /// Blocks until the event loop has exited and the handle is destroyed.
    /// Fails with `AlreadyClosed` unless the player is Running.
    pub fn close(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);

        if let Err(current) = self.shared.begin_close() {
            warn!("Close rejected: player is {}", current);
            return Err(Error::AlreadyClosed);
        }

        let Some(generation) = lifecycle.take() else {
            error!("Player was running without an event loop");
            self.abort_open();
            return Err(Error::AlreadyClosed);
        };

        info!("Closing engine (generation {})", generation.id);

        // Waking through the read side is fine: the loop holds a read guard too
        if let Err(e) = self.shared.with_handle(|handle| {
            handle.wakeup();
            Ok(())
        }) {
            warn!("Could not wake event loop: {}", e);
        }

        match generation.quit.recv() {
            Ok(()) => debug!("Event loop acknowledged close (generation {})", generation.id),
            Err(_) => error!(
                "Event loop ended without acknowledging close (generation {})",
                generation.id
            ),
        }
        if generation.thread.join().is_err() {
            error!("Event loop thread panicked (generation {})", generation.id);
        }

        // Dropping the last sender ends every subscriber's stream
        self.shared.take_events();
        drop(self.shared.take_handle());
        self.shared.set_playing(false);
        self.shared.set_state(RunningState::Closed);

        info!("Engine closed (generation {})", generation.id);
        Ok(())
    }

    pub fn running_state(&self) -> RunningState {
        self.shared.running_state()
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// True between a start-file and the following end-file event
    pub fn is_playing(&self) -> bool {
        self.shared.is_playing()
    }

    /// Total engine errors reported by event waits since construction
    pub fn engine_faults(&self) -> u64 {
        self.shared.engine_faults()
    }

    pub fn status(&self) -> PlayerStatus {
        PlayerStatus {
            state: self.running_state(),
            playing: self.is_playing(),
            generation: self.shared.generation(),
            engine_faults: self.engine_faults(),
        }
    }

    /// Receive events of the current generation
    ///
    /// The stream ends when this generation is closed.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<PlayerEvent>> {
        self.shared.subscribe()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if self.is_running() {
            debug!("Closing engine on drop");
            if let Err(e) = self.close() {
                warn!("Failed to close engine on drop: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("engine", &self.engine.name())
            .field("state", &self.running_state())
            .field("playing", &self.is_playing())
            .finish()
    }
}
