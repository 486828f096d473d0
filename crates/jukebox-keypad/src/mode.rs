//! Playback modes and the queue work that moves between them.
//!
//! ```text
//!            sentinel                 station
//!   Normal ───────────▶ ShuffleAll ───────────▶ Radio
//!     ▲  ◀───────────     │                      │
//!     │    sentinel       │ song code            │ song code / sentinel
//!     └───────────────────┴──────────────────────┘
//! ```
//!
//! The mode only changes after the daemon accepted every mutation of the
//! transition, so a failed round-trip leaves the previous mode in place.

use std::collections::HashSet;
use std::fmt;

use jukebox_proto::mpd::Connector;
use rand::seq::SliceRandom;
use rand::RngCore;
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::Catalogs;
use crate::session::{Session, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Normal,
    ShuffleAll,
    Radio,
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackMode::Normal => write!(f, "normal"),
            PlaybackMode::ShuffleAll => write!(f, "shuffle-all"),
            PlaybackMode::Radio => write!(f, "radio"),
        }
    }
}

impl PlaybackMode {
    /// Validate a direct move to `to`. Entering a special mode from the
    /// other special mode has to pass through `Normal`, except for radio,
    /// which replaces the queue anyway.
    pub fn transition(self, to: PlaybackMode) -> Result<PlaybackMode, ModeError> {
        use PlaybackMode::*;
        match (self, to) {
            (Normal, ShuffleAll)
            | (Normal, Radio)
            | (ShuffleAll, Normal)
            | (ShuffleAll, Radio)
            | (Radio, Normal)
            | (Radio, Radio) => Ok(to),
            _ => Err(ModeError::InvalidTransition { from: self, to }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ModeError {
    #[error("invalid mode transition {from} -> {to}")]
    InvalidTransition { from: PlaybackMode, to: PlaybackMode },
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// What a completed plain code did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeOutcome {
    Enqueued,
    AlreadyQueued,
    NoMatch,
    ShuffleStarted,
    ShuffleStopped,
}

impl CodeOutcome {
    pub fn enqueued(self) -> bool {
        self == CodeOutcome::Enqueued
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationOutcome {
    Tuned,
    /// The station's streams already are the queue.
    AlreadyTuned,
    NoMatch,
}

impl StationOutcome {
    /// Whether the code named a station, which ends the gesture.
    pub fn matched(self) -> bool {
        self != StationOutcome::NoMatch
    }
}

#[derive(Debug, Clone)]
pub struct ModeOptions {
    pub shuffle_code: String,
    /// Append in catalog order and have the daemon shuffle the appended range.
    pub daemon_shuffle: bool,
}

/// Borrowed view over everything one code dispatch touches.
pub struct Coordinator<'a, C: Connector> {
    pub mode: &'a mut PlaybackMode,
    pub session: &'a mut Session<C>,
    pub catalogs: &'a Catalogs,
    pub options: &'a ModeOptions,
    pub rng: &'a mut dyn RngCore,
}

impl<'a, C: Connector> Coordinator<'a, C> {
    /// Route a completed plain code: the sentinel toggles shuffle-all,
    /// anything else is a song.
    pub fn dispatch_code(&mut self, code: &str) -> Result<CodeOutcome, ModeError> {
        if code == self.options.shuffle_code {
            self.toggle_shuffle_all()
        } else {
            self.enqueue_song(code)
        }
    }

    pub fn toggle_shuffle_all(&mut self) -> Result<CodeOutcome, ModeError> {
        match *self.mode {
            PlaybackMode::ShuffleAll => {
                self.exit_shuffle_all()?;
                Ok(CodeOutcome::ShuffleStopped)
            }
            PlaybackMode::Radio => {
                self.exit_radio()?;
                self.enter_shuffle_all()
            }
            PlaybackMode::Normal => self.enter_shuffle_all(),
        }
    }

    pub fn enqueue_song(&mut self, code: &str) -> Result<CodeOutcome, ModeError> {
        let catalogs = self.catalogs;
        let Some(reference) = catalogs.songs.get(code) else {
            info!("No song for code {}", code);
            return Ok(CodeOutcome::NoMatch);
        };

        match *self.mode {
            PlaybackMode::Radio => self.exit_radio()?,
            PlaybackMode::ShuffleAll => self.exit_shuffle_all()?,
            PlaybackMode::Normal => {}
        }

        if self.session.enqueue(reference)? {
            Ok(CodeOutcome::Enqueued)
        } else {
            Ok(CodeOutcome::AlreadyQueued)
        }
    }

    pub fn tune_station(&mut self, code: &str) -> Result<StationOutcome, ModeError> {
        let catalogs = self.catalogs;
        let Some(playlist) = catalogs.stations.get(code) else {
            debug!("No station for code {}", code);
            return Ok(StationOutcome::NoMatch);
        };
        let target = self.mode.transition(PlaybackMode::Radio)?;

        let streams = self.session.playlist_entries(playlist)?;
        if !streams.is_empty() && self.session.queued()? == streams {
            info!("Already tuned to {}", playlist);
            self.set_mode(target);
            return Ok(StationOutcome::AlreadyTuned);
        }

        info!("Tuning to {}", playlist);
        self.session.clear_queue()?;
        self.session.load_playlist(playlist)?;
        self.session.play()?;
        self.set_mode(target);
        Ok(StationOutcome::Tuned)
    }

    /// Queue every catalogued song that is not queued yet, in a fresh random
    /// order, and start playing.
    pub fn enter_shuffle_all(&mut self) -> Result<CodeOutcome, ModeError> {
        let target = self.mode.transition(PlaybackMode::ShuffleAll)?;
        let catalogs = self.catalogs;

        let queued: HashSet<String> = self.session.queued()?.into_iter().collect();
        let mut songs: Vec<&str> = catalogs
            .songs
            .references()
            .filter(|song| !queued.contains(*song))
            .collect();

        if self.options.daemon_shuffle {
            let start = self.session.get_status()?.queue_len;
            for song in &songs {
                self.session.append(song)?;
            }
            let end = self.session.get_status()?.queue_len;
            if end > start + 1 {
                self.session.shuffle_queue(start..end)?;
            }
        } else {
            songs.shuffle(&mut *self.rng);
            for song in &songs {
                self.session.append(song)?;
            }
        }

        self.session.play()?;
        info!("Shuffling {} songs", songs.len());
        self.set_mode(target);
        Ok(CodeOutcome::ShuffleStarted)
    }

    /// Drop every queued song except the one playing. Stopped: drop all.
    pub fn exit_shuffle_all(&mut self) -> Result<(), ModeError> {
        let target = self.mode.transition(PlaybackMode::Normal)?;

        let status = self.session.get_status()?;
        match status.song_pos.filter(|_| status.is_playing()) {
            Some(pos) => {
                if pos + 1 < status.queue_len {
                    self.session.delete_range(pos + 1..status.queue_len)?;
                }
                if pos > 0 {
                    self.session.delete_range(0..pos)?;
                }
            }
            None => self.session.clear_queue()?,
        }

        self.set_mode(target);
        Ok(())
    }

    pub fn exit_radio(&mut self) -> Result<(), ModeError> {
        let target = self.mode.transition(PlaybackMode::Normal)?;
        self.session.clear_queue()?;
        self.set_mode(target);
        Ok(())
    }

    fn set_mode(&mut self, mode: PlaybackMode) {
        if *self.mode != mode {
            info!("Mode {} -> {}", self.mode, mode);
        }
        *self.mode = mode;
    }
}
