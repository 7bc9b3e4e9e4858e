//! Scripted in-process engine
//!
//! Stands in for the real engine in tests and in builds without the `libmpv`
//! feature. Every call that reaches a handle is recorded as an
//! [`EngineCall`], events can be injected with [`MockEngine::emit`] and
//! failures can be scripted per option, command or property name.
//!
//! Wakeups are sticky like libmpv's: a wakeup issued while nobody is waiting
//! makes the next `wait_event` return immediately.
//!
//! With [`MockEngine::with_simulated_playback`] the engine answers every
//! submission with its reply event and turns `loadfile`/`loadlist` into
//! start-file and `stop` into end-file, which is enough to drive the daemon
//! end to end without a media engine installed.

use super::{
    event_id, Engine, EngineError, EngineHandle, OptionValue, RawEvent, ERROR_INVALID_PARAMETER,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// A call that reached a mock handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Create,
    SetOption { name: String, value: OptionValue },
    Initialize,
    Command(Vec<String>),
    SetProperty { name: String, value: String },
    Wakeup,
    Destroy,
}

impl EngineCall {
    /// True for calls that submit work (commands and property writes)
    pub fn is_submission(&self) -> bool {
        matches!(self, EngineCall::Command(_) | EngineCall::SetProperty { .. })
    }
}

#[derive(Default)]
struct Failures {
    create: Option<EngineError>,
    initialize: Option<EngineError>,
    options: HashMap<String, EngineError>,
    commands: HashMap<String, EngineError>,
    properties: HashMap<String, EngineError>,
}

#[derive(Default)]
struct QueueState {
    events: VecDeque<RawEvent>,
    woken: bool,
}

/// Per-handle event source
#[derive(Default)]
struct EventQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl EventQueue {
    fn push(&self, event: RawEvent) {
        self.state.lock().unwrap().events.push_back(event);
        self.ready.notify_all();
    }

    fn wake(&self) {
        self.state.lock().unwrap().woken = true;
        self.ready.notify_all();
    }

    fn wait(&self, timeout: f64) -> RawEvent {
        let deadline = (timeout >= 0.0).then(|| Instant::now() + Duration::from_secs_f64(timeout));
        let mut state = self.state.lock().unwrap();

        loop {
            if let Some(event) = state.events.pop_front() {
                return event;
            }
            if state.woken {
                state.woken = false;
                return RawEvent::none();
            }

            match deadline {
                None => state = self.ready.wait(state).unwrap(),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return RawEvent::none();
                    }
                    state = self.ready.wait_timeout(state, deadline - now).unwrap().0;
                }
            }
        }
    }
}

#[derive(Default)]
struct MockInner {
    calls: Mutex<Vec<EngineCall>>,
    failures: Mutex<Failures>,

    /// Event queue of the live handle, if any
    current: Mutex<Option<Arc<EventQueue>>>,

    /// Events emitted while no handle was live
    pending: Mutex<VecDeque<RawEvent>>,

    live: AtomicUsize,
    waiters: AtomicUsize,
    created: AtomicUsize,

    simulate_playback: bool,
    file_loaded: AtomicBool,
}

impl MockInner {
    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Scripted engine; clones share the same recorded state
#[derive(Clone, Default)]
pub struct MockEngine {
    inner: Arc<MockInner>,
}

impl MockEngine {
    /// Engine that only does what the test scripts
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that answers submissions with reply and playback events
    pub fn with_simulated_playback() -> Self {
        Self {
            inner: Arc::new(MockInner {
                simulate_playback: true,
                ..MockInner::default()
            }),
        }
    }

    /// Inject an event with the given id into the live handle
    ///
    /// Events emitted while no handle is live are delivered to the next one.
    pub fn emit(&self, id: u32) {
        self.emit_raw(RawEvent::new(id));
    }

    /// Inject a fully specified raw event
    pub fn emit_raw(&self, event: RawEvent) {
        let current = self.inner.current.lock().unwrap();
        match current.as_ref() {
            Some(queue) => queue.push(event),
            None => self.inner.pending.lock().unwrap().push_back(event),
        }
    }

    /// Make the next `create` fail
    pub fn fail_create(&self, error: EngineError) {
        self.inner.failures.lock().unwrap().create = Some(error);
    }

    /// Make `initialize` fail
    pub fn fail_initialize(&self, error: EngineError) {
        self.inner.failures.lock().unwrap().initialize = Some(error);
    }

    /// Make setting the named option fail
    pub fn fail_option(&self, name: &str, error: EngineError) {
        self.inner.failures.lock().unwrap().options.insert(name.to_string(), error);
    }

    /// Make commands whose first argument is `name` fail
    pub fn fail_command(&self, name: &str, error: EngineError) {
        self.inner.failures.lock().unwrap().commands.insert(name.to_string(), error);
    }

    /// Make writes to the named property fail
    pub fn fail_property(&self, name: &str, error: EngineError) {
        self.inner.failures.lock().unwrap().properties.insert(name.to_string(), error);
    }

    /// Remove every scripted failure
    pub fn clear_failures(&self) {
        *self.inner.failures.lock().unwrap() = Failures::default();
    }

    /// All calls recorded so far, in order
    pub fn calls(&self) -> Vec<EngineCall> {
        self.inner.calls.lock().unwrap().clone()
    }

    /// Only the submitted commands and property writes
    pub fn submissions(&self) -> Vec<EngineCall> {
        self.calls().into_iter().filter(EngineCall::is_submission).collect()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().unwrap().clear();
    }

    /// Number of handles not yet destroyed
    pub fn live_handles(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// Number of threads currently blocked in `wait_event`
    pub fn waiting_threads(&self) -> usize {
        self.inner.waiters.load(Ordering::SeqCst)
    }

    /// Number of handles created since the engine was built
    pub fn handles_created(&self) -> usize {
        self.inner.created.load(Ordering::SeqCst)
    }
}

impl Engine for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn create(&self) -> Result<Box<dyn EngineHandle>, EngineError> {
        self.inner.record(EngineCall::Create);

        if let Some(err) = self.inner.failures.lock().unwrap().create.take() {
            return Err(err);
        }

        let queue = Arc::new(EventQueue::default());
        {
            let mut current = self.inner.current.lock().unwrap();
            let mut pending = self.inner.pending.lock().unwrap();
            queue.state.lock().unwrap().events.extend(pending.drain(..));
            *current = Some(Arc::clone(&queue));
        }

        self.inner.created.fetch_add(1, Ordering::SeqCst);
        self.inner.live.fetch_add(1, Ordering::SeqCst);
        self.inner.file_loaded.store(false, Ordering::SeqCst);

        Ok(Box::new(MockHandle {
            inner: Arc::clone(&self.inner),
            queue,
        }))
    }
}

struct MockHandle {
    inner: Arc<MockInner>,
    queue: Arc<EventQueue>,
}

impl MockHandle {
    fn check_marshal(values: &[&str]) -> Result<(), EngineError> {
        if values.iter().any(|v| v.contains('\0')) {
            return Err(EngineError::Allocation("argument contains NUL byte".to_string()));
        }
        Ok(())
    }

    fn simulate_command(&self, reply_id: u64, args: &[String]) {
        let mut reply = RawEvent::new(event_id::COMMAND_REPLY);
        reply.reply_id = reply_id;
        self.queue.push(reply);

        match args[0].as_str() {
            "loadfile" | "loadlist" => {
                if self.inner.file_loaded.swap(true, Ordering::SeqCst) {
                    self.queue.push(RawEvent::new(event_id::END_FILE));
                }
                self.queue.push(RawEvent::new(event_id::START_FILE));
            }
            "stop" => {
                if self.inner.file_loaded.swap(false, Ordering::SeqCst) {
                    self.queue.push(RawEvent::new(event_id::END_FILE));
                }
                self.queue.push(RawEvent::new(event_id::IDLE));
            }
            _ => {}
        }
    }
}

impl EngineHandle for MockHandle {
    fn set_option(&self, name: &str, value: &OptionValue) -> Result<(), EngineError> {
        Self::check_marshal(&[name])?;
        self.inner.record(EngineCall::SetOption {
            name: name.to_string(),
            value: value.clone(),
        });

        match self.inner.failures.lock().unwrap().options.get(name) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn initialize(&self) -> Result<(), EngineError> {
        self.inner.record(EngineCall::Initialize);

        match self.inner.failures.lock().unwrap().initialize.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn command_async(&self, reply_id: u64, args: &[String]) -> Result<(), EngineError> {
        if args.is_empty() {
            return Err(EngineError::rejected(ERROR_INVALID_PARAMETER, "empty command"));
        }
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        Self::check_marshal(&refs)?;

        self.inner.record(EngineCall::Command(args.to_vec()));

        if let Some(err) = self.inner.failures.lock().unwrap().commands.get(&args[0]) {
            return Err(err.clone());
        }

        if self.inner.simulate_playback {
            self.simulate_command(reply_id, args);
        }
        Ok(())
    }

    fn set_property_async(
        &self,
        reply_id: u64,
        name: &str,
        value: &str,
    ) -> Result<(), EngineError> {
        Self::check_marshal(&[name, value])?;

        self.inner.record(EngineCall::SetProperty {
            name: name.to_string(),
            value: value.to_string(),
        });

        if let Some(err) = self.inner.failures.lock().unwrap().properties.get(name) {
            return Err(err.clone());
        }

        if self.inner.simulate_playback {
            let mut reply = RawEvent::new(event_id::SET_PROPERTY_REPLY);
            reply.reply_id = reply_id;
            self.queue.push(reply);
        }
        Ok(())
    }

    fn wait_event(&self, timeout: f64) -> RawEvent {
        self.inner.waiters.fetch_add(1, Ordering::SeqCst);
        let event = self.queue.wait(timeout);
        self.inner.waiters.fetch_sub(1, Ordering::SeqCst);
        event
    }

    fn wakeup(&self) {
        self.inner.record(EngineCall::Wakeup);
        self.queue.wake();
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.inner.record(EngineCall::Destroy);

        let mut current = self.inner.current.lock().unwrap();
        if current.as_ref().is_some_and(|q| Arc::ptr_eq(q, &self.queue)) {
            *current = None;
        }
        self.inner.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wakeup_is_sticky() {
        let engine = MockEngine::new();
        let handle = engine.create().unwrap();

        handle.wakeup();
        assert_eq!(handle.wait_event(-1.0), RawEvent::none());

        // Consumed: a zero timeout now returns none without blocking
        assert_eq!(handle.wait_event(0.0).id, event_id::NONE);
    }

    #[test]
    fn test_wakeup_releases_blocked_waiter() {
        let engine = MockEngine::new();
        let handle: Arc<dyn EngineHandle> = Arc::from(engine.create().unwrap());

        let waiter = {
            let handle = Arc::clone(&handle);
            std::thread::spawn(move || handle.wait_event(-1.0))
        };

        while engine.waiting_threads() == 0 {
            std::thread::yield_now();
        }
        handle.wakeup();

        assert_eq!(waiter.join().unwrap().id, event_id::NONE);
        assert_eq!(engine.waiting_threads(), 0);
    }

    #[test]
    fn test_events_emitted_before_create_are_delivered() {
        let engine = MockEngine::new();
        engine.emit(event_id::IDLE);

        let handle = engine.create().unwrap();
        assert_eq!(handle.wait_event(0.0).id, event_id::IDLE);
    }

    #[test]
    fn test_drop_records_destroy() {
        let engine = MockEngine::new();
        let handle = engine.create().unwrap();
        assert_eq!(engine.live_handles(), 1);

        drop(handle);
        assert_eq!(engine.live_handles(), 0);
        assert_eq!(engine.calls(), vec![EngineCall::Create, EngineCall::Destroy]);
    }

    #[test]
    fn test_scripted_failures() {
        let engine = MockEngine::new();
        engine.fail_property("volume", EngineError::rejected(-7, "property unavailable"));
        let handle = engine.create().unwrap();

        assert!(handle.set_property_async(1, "pause", "yes").is_ok());
        assert!(matches!(
            handle.set_property_async(2, "volume", "50"),
            Err(EngineError::Rejected { code: -7, .. })
        ));
        assert!(matches!(
            handle.command_async(3, &["show-text".to_string(), "a\0b".to_string()]),
            Err(EngineError::Allocation(_))
        ));
    }

    #[test]
    fn test_simulated_playback_events() {
        let engine = MockEngine::with_simulated_playback();
        let handle = engine.create().unwrap();

        handle
            .command_async(9, &["loadfile".to_string(), "a.mp4".to_string()])
            .unwrap();

        let reply = handle.wait_event(0.0);
        assert_eq!(reply.id, event_id::COMMAND_REPLY);
        assert_eq!(reply.reply_id, 9);
        assert_eq!(handle.wait_event(0.0).id, event_id::START_FILE);

        handle.command_async(10, &["stop".to_string()]).unwrap();
        assert_eq!(handle.wait_event(0.0).id, event_id::COMMAND_REPLY);
        assert_eq!(handle.wait_event(0.0).id, event_id::END_FILE);
        assert_eq!(handle.wait_event(0.0).id, event_id::IDLE);
    }
}
