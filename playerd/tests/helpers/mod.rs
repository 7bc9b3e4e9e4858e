//! Test helpers for playerd integration tests
//!
//! - `TestPlayer`: a `Player` wired to a `MockEngine`
//! - `wait_until`: poll a condition written against the event loop thread

#![allow(dead_code)]

use playerd::engine::mock::MockEngine;
use playerd::{PlaybackService, Player};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound for anything the event loop does asynchronously
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll `condition` until it holds or `EVENT_TIMEOUT` passes
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Startup flags used by the daemon by default
pub fn default_flags() -> BTreeMap<String, bool> {
    [
        ("keep-open", true),
        ("no-resume-playback", true),
        ("video", false),
        ("ytdl", true),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

pub fn no_options() -> BTreeMap<String, String> {
    BTreeMap::new()
}

pub struct TestPlayer {
    pub engine: MockEngine,
    pub player: Arc<Player>,
    pub playback: PlaybackService,
}

impl TestPlayer {
    /// Closed player on a scripted engine
    pub fn new() -> Self {
        Self::with_engine(MockEngine::new())
    }

    pub fn with_engine(engine: MockEngine) -> Self {
        let player = Arc::new(Player::new(Arc::new(engine.clone())));
        let playback = PlaybackService::new(Arc::clone(&player));
        Self {
            engine,
            player,
            playback,
        }
    }

    /// Running player with the default flags and the call log cleared
    pub fn running() -> Self {
        Self::running_with(MockEngine::new())
    }

    pub fn running_with(engine: MockEngine) -> Self {
        let test = Self::with_engine(engine);
        test.player
            .open(&default_flags(), &no_options())
            .expect("open should succeed");
        test.engine.clear_calls();
        test
    }
}
