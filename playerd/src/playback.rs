//! Playback service
//!
//! Higher-level operations on top of [`Player`]. Loads are two separate
//! submissions (unpause, then load) and are not atomic: a concurrent close
//! between them is caught by the Running check on the second step.

use crate::error::{Error, Result};
use crate::player::Player;
use playerd_common::{PlayerEvent, PlayerStatus};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// True if `path` carries a URL scheme marker (`https://`, `ytdl://`, ...)
pub fn is_remote(path: &str) -> bool {
    match path.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        }
        None => false,
    }
}

/// Only a definite "does not exist" counts; other stat errors are left to the engine
fn is_missing(path: &str) -> bool {
    matches!(std::fs::metadata(path), Err(e) if e.kind() == io::ErrorKind::NotFound)
}

#[derive(Debug, Clone)]
pub struct PlaybackService {
    player: Arc<Player>,
}

impl PlaybackService {
    pub fn new(player: Arc<Player>) -> Self {
        Self { player }
    }

    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    /// Load and play a single file or remote stream
    pub fn play_file(&self, path: &str) -> Result<()> {
        self.load("loadfile", path)
    }

    /// Load and play a playlist file
    pub fn play_playlist(&self, path: &str) -> Result<()> {
        self.load("loadlist", path)
    }

    fn load(&self, command: &str, path: &str) -> Result<()> {
        if !is_remote(path) && is_missing(path) {
            info!("Not loading {}: no such file", path);
            return Err(Error::FileNotFound(PathBuf::from(path)));
        }

        self.player.set_property("pause", "no")?;
        self.player.set_command([command, path])?;

        info!("Loading {}", path);
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        self.player.set_property("pause", "yes")
    }

    pub fn resume(&self) -> Result<()> {
        self.player.set_property("pause", "no")
    }

    /// Relative seek in seconds, or any target the engine's `seek` accepts
    pub fn seek(&self, value: &str) -> Result<()> {
        self.player.set_command(["seek", value])
    }

    pub fn next(&self) -> Result<()> {
        self.player.set_command(["playlist-next"])
    }

    pub fn previous(&self) -> Result<()> {
        self.player.set_command(["playlist-prev"])
    }

    /// Set the on-screen display level
    pub fn osd(&self, value: &str) -> Result<()> {
        self.player.set_command(["osd", value])
    }

    pub fn stop(&self) -> Result<()> {
        self.player.set_command(["stop"])
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    pub fn status(&self) -> PlayerStatus {
        self.player.status()
    }

    pub fn subscribe(&self) -> Result<broadcast::Receiver<PlayerEvent>> {
        self.player.subscribe()
    }
}
