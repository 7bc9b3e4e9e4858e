//! Lifecycle tests: open/close state machine, quit handshake and teardown

mod helpers;

use helpers::{default_flags, no_options, wait_until, TestPlayer};
use playerd::engine::mock::{EngineCall, MockEngine};
use playerd::engine::{event_id, EngineError, OptionValue, RawEvent};
use playerd::{Error, ErrorKind, PlayerEvent, RunningState};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;

#[test]
fn test_open_applies_flags_then_options_then_initializes() {
    let test = TestPlayer::new();

    let mut options = BTreeMap::new();
    options.insert("hwdec".to_string(), "auto".to_string());

    test.player.open(&default_flags(), &options).unwrap();
    assert_eq!(test.player.running_state(), RunningState::Running);
    assert!(test.player.is_running());

    let calls = test.engine.calls();
    assert_eq!(
        calls,
        vec![
            EngineCall::Create,
            EngineCall::SetOption {
                name: "keep-open".into(),
                value: OptionValue::Flag(true)
            },
            EngineCall::SetOption {
                name: "no-resume-playback".into(),
                value: OptionValue::Flag(true)
            },
            EngineCall::SetOption {
                name: "video".into(),
                value: OptionValue::Flag(false)
            },
            EngineCall::SetOption {
                name: "ytdl".into(),
                value: OptionValue::Flag(true)
            },
            EngineCall::SetOption {
                name: "hwdec".into(),
                value: OptionValue::Str("auto".into())
            },
            EngineCall::Initialize,
        ]
    );

    // open returns once the loop is launched; it parks in the wait shortly after
    assert!(wait_until(|| test.engine.waiting_threads() == 1));
    test.player.close().unwrap();
}

#[test]
fn test_open_while_running_is_rejected() {
    let test = TestPlayer::running();

    let err = test.player.open(&default_flags(), &no_options()).unwrap_err();
    assert!(matches!(err, Error::AlreadyRunning));
    assert_eq!(err.kind(), ErrorKind::AlreadyRunning);

    assert_eq!(test.player.running_state(), RunningState::Running);
    assert_eq!(test.engine.handles_created(), 1);
    assert!(test.engine.calls().is_empty());

    test.player.close().unwrap();
}

#[test]
fn test_close_while_closed_is_rejected_without_side_effects() {
    let test = TestPlayer::new();

    let err = test.player.close().unwrap_err();
    assert!(matches!(err, Error::AlreadyClosed));
    assert_eq!(err.kind(), ErrorKind::NotRunning);

    assert_eq!(test.player.running_state(), RunningState::Closed);
    assert!(test.engine.calls().is_empty());
}

#[test]
fn test_close_stops_loop_and_destroys_handle() {
    let test = TestPlayer::running();
    assert!(wait_until(|| test.engine.waiting_threads() == 1));

    test.player.close().unwrap();

    assert_eq!(test.player.running_state(), RunningState::Closed);
    assert_eq!(test.engine.live_handles(), 0);
    assert_eq!(test.engine.waiting_threads(), 0);
    assert_eq!(test.engine.calls(), vec![EngineCall::Wakeup, EngineCall::Destroy]);
}

#[test]
fn test_close_before_loop_parks() {
    // Sticky wakeup: close right after open must not hang
    let test = TestPlayer::new();
    for _ in 0..10 {
        test.player.open(&default_flags(), &no_options()).unwrap();
        test.player.close().unwrap();
    }
    assert_eq!(test.engine.live_handles(), 0);
}

#[test]
fn test_repeated_cycles_are_independent() {
    let test = TestPlayer::new();

    for cycle in 1..=20u64 {
        test.player.open(&default_flags(), &no_options()).unwrap();
        assert!(!test.player.is_playing(), "cycle {} started playing", cycle);
        assert_eq!(test.player.status().generation, cycle);

        test.engine.emit(event_id::START_FILE);
        assert!(wait_until(|| test.player.is_playing()));

        test.player.close().unwrap();
        assert!(!test.player.is_playing());
        assert_eq!(test.engine.live_handles(), 0);
        assert_eq!(test.engine.waiting_threads(), 0);
    }

    assert_eq!(test.engine.handles_created(), 20);
}

#[test]
fn test_failed_option_rolls_back_open() {
    let engine = MockEngine::new();
    engine.fail_option("ytdl", EngineError::rejected(-5, "option not found"));
    let test = TestPlayer::with_engine(engine);

    let err = test.player.open(&default_flags(), &no_options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OptionRejected);
    assert!(err.to_string().contains("ytdl"));

    assert_eq!(test.player.running_state(), RunningState::Closed);
    assert_eq!(test.engine.live_handles(), 0);
    assert!(!test.engine.calls().contains(&EngineCall::Initialize));
    assert!(matches!(test.player.subscribe(), Err(Error::NotRunning)));

    // A later open starts clean
    test.engine.clear_failures();
    test.player.open(&default_flags(), &no_options()).unwrap();
    assert_eq!(test.engine.live_handles(), 1);
    test.player.close().unwrap();
}

#[test]
fn test_failed_initialize_rolls_back_open() {
    let engine = MockEngine::new();
    engine.fail_initialize(EngineError::rejected(-1, "unsupported"));
    let test = TestPlayer::with_engine(engine);

    let err = test.player.open(&default_flags(), &no_options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InitializationFailed);
    assert_eq!(test.player.running_state(), RunningState::Closed);
    assert_eq!(test.engine.live_handles(), 0);
    assert_eq!(test.engine.calls().last(), Some(&EngineCall::Destroy));
}

#[test]
fn test_failed_create_leaves_player_closed() {
    let engine = MockEngine::new();
    engine.fail_create(EngineError::rejected(-2, "out of memory"));
    let test = TestPlayer::with_engine(engine);

    let err = test.player.open(&default_flags(), &no_options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InitializationFailed);
    assert_eq!(test.player.running_state(), RunningState::Closed);
    assert_eq!(test.engine.handles_created(), 0);

    // The scripted failure is one-shot
    test.player.open(&default_flags(), &no_options()).unwrap();
    test.player.close().unwrap();
}

#[test]
fn test_subscriber_stream_ends_on_close() {
    let test = TestPlayer::running();
    let mut rx = test.player.subscribe().unwrap();

    test.engine.emit(event_id::START_FILE);
    assert_eq!(rx.blocking_recv().unwrap(), PlayerEvent::StartFile);

    test.player.close().unwrap();
    assert!(matches!(rx.blocking_recv(), Err(RecvError::Closed)));
    assert!(matches!(test.player.subscribe(), Err(Error::NotRunning)));
}

#[test]
fn test_no_events_after_close() {
    let test = TestPlayer::running();
    test.player.close().unwrap();

    test.engine.emit(event_id::START_FILE);
    std::thread::sleep(Duration::from_millis(50));
    assert!(!test.player.is_playing());
    assert!(test.engine.submissions().is_empty());
}

#[test]
fn test_engine_fault_is_counted_and_loop_continues() {
    let test = TestPlayer::running();

    test.engine.emit_raw(RawEvent::error(event_id::NONE, -13));
    test.engine.emit(event_id::START_FILE);

    assert!(wait_until(|| test.player.is_playing()));
    assert_eq!(test.player.engine_faults(), 1);
    assert_eq!(test.player.status().engine_faults, 1);
    assert!(test.player.is_running());

    test.player.close().unwrap();
}

#[test]
fn test_errored_event_is_not_translated() {
    let test = TestPlayer::running();

    test.engine.emit_raw(RawEvent::error(event_id::START_FILE, -6));
    assert!(wait_until(|| test.player.engine_faults() == 1));
    assert!(!test.player.is_playing());

    test.player.close().unwrap();
}

#[test]
fn test_close_after_engine_shutdown_event() {
    let test = TestPlayer::running();
    test.engine.emit(event_id::SHUTDOWN);
    std::thread::sleep(Duration::from_millis(20));

    let started = Instant::now();
    test.player.close().unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(test.engine.live_handles(), 0);
}

#[test]
fn test_dropping_player_closes_engine() {
    let engine = MockEngine::new();
    {
        let test = TestPlayer::running_with(engine.clone());
        assert_eq!(engine.live_handles(), 1);
        drop(test);
    }
    assert_eq!(engine.live_handles(), 0);
    assert_eq!(engine.waiting_threads(), 0);
}

#[test]
fn test_concurrent_open_only_one_wins() {
    let test = TestPlayer::new();

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| test.player.open(&default_flags(), &no_options())))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| e.kind() == ErrorKind::AlreadyRunning));
    assert_eq!(test.engine.handles_created(), 1);

    test.player.close().unwrap();
}
