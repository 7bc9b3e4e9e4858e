//! Shared player state
//!
//! State shared between caller threads and the engine event loop:
//!
//! - `state`: the Running State. Its mutex is only ever held for the read or
//!   write itself, never across an engine call.
//! - `gate`: submissions hold the read side from their Running check until
//!   the engine call returns; the Running -> Closing transition takes the
//!   write side, so nothing is submitted once close has begun.
//! - `handle`: slot for the live engine handle. Engine calls borrow it
//!   through a read guard; only close/abort take the write side to destroy
//!   it, after the event loop has exited.
//! - `events`: sender of the current generation's event channel, kept for
//!   new subscribers
//! - playback flag and counters as atomics

use crate::engine::{EngineHandle, RawEvent};
use crate::error::{Error, Result};
use playerd_common::{PlayerEvent, RunningState};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Timeout passed to the engine for an unbounded wait
pub(crate) const WAIT_FOREVER: f64 = -1.0;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct Shared {
    state: Mutex<RunningState>,
    gate: RwLock<()>,
    handle: RwLock<Option<Box<dyn EngineHandle>>>,
    events: Mutex<Option<broadcast::Sender<PlayerEvent>>>,

    playing: AtomicBool,
    engine_faults: AtomicU64,
    generation: AtomicU64,
    reply_seq: AtomicU64,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RunningState::Closed),
            gate: RwLock::new(()),
            handle: RwLock::new(None),
            events: Mutex::new(None),
            playing: AtomicBool::new(false),
            engine_faults: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            reply_seq: AtomicU64::new(0),
        }
    }

    // ----- Running State -----

    pub(crate) fn running_state(&self) -> RunningState {
        *lock(&self.state)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running_state() == RunningState::Running
    }

    /// Move from `from` to `to` atomically; returns the observed state on mismatch
    pub(crate) fn transition(
        &self,
        from: RunningState,
        to: RunningState,
    ) -> std::result::Result<(), RunningState> {
        let mut state = lock(&self.state);
        if *state != from {
            return Err(*state);
        }
        *state = to;
        Ok(())
    }

    pub(crate) fn set_state(&self, to: RunningState) {
        *lock(&self.state) = to;
    }

    pub(crate) fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(Error::NotRunning)
        }
    }

    /// Running -> Closing, waiting out submissions already past their check
    pub(crate) fn begin_close(&self) -> std::result::Result<(), RunningState> {
        let _gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        self.transition(RunningState::Running, RunningState::Closing)
    }

    // ----- Engine handle slot -----

    pub(crate) fn install_handle(&self, handle: Box<dyn EngineHandle>) {
        *self.handle.write().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    pub(crate) fn take_handle(&self) -> Option<Box<dyn EngineHandle>> {
        self.handle.write().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Run `f` against the live handle
    pub(crate) fn with_handle<R>(
        &self,
        f: impl FnOnce(&dyn EngineHandle) -> Result<R>,
    ) -> Result<R> {
        let slot = self.handle.read().unwrap_or_else(PoisonError::into_inner);
        match slot.as_deref() {
            Some(handle) => f(handle),
            None => Err(Error::NotRunning),
        }
    }

    /// Run `f` against the live handle if the player is Running
    ///
    /// Close cannot begin while `f` runs, so `f` must not block.
    pub(crate) fn with_running_handle<R>(
        &self,
        f: impl FnOnce(&dyn EngineHandle) -> Result<R>,
    ) -> Result<R> {
        let _gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        self.ensure_running()?;
        self.with_handle(f)
    }

    /// Block in the engine's event wait; only the event loop calls this
    pub(crate) fn wait_event(&self) -> RawEvent {
        let slot = self.handle.read().unwrap_or_else(PoisonError::into_inner);
        match slot.as_deref() {
            Some(handle) => handle.wait_event(WAIT_FOREVER),
            None => RawEvent::none(),
        }
    }

    // ----- Event distribution -----

    pub(crate) fn install_events(&self, sender: broadcast::Sender<PlayerEvent>) {
        *lock(&self.events) = Some(sender);
    }

    pub(crate) fn take_events(&self) -> Option<broadcast::Sender<PlayerEvent>> {
        lock(&self.events).take()
    }

    pub(crate) fn subscribe(&self) -> Result<broadcast::Receiver<PlayerEvent>> {
        lock(&self.events)
            .as_ref()
            .map(broadcast::Sender::subscribe)
            .ok_or(Error::NotRunning)
    }

    // ----- Playback flag and counters -----

    pub(crate) fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub(crate) fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    /// Count one engine fault, returning the new total
    pub(crate) fn record_fault(&self) -> u64 {
        self.engine_faults.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn engine_faults(&self) -> u64 {
        self.engine_faults.load(Ordering::Relaxed)
    }

    pub(crate) fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(crate) fn next_reply_id(&self) -> u64 {
        self.reply_seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}
