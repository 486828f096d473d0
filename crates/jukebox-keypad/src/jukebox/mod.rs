//! The controller a driver talks to: one keystroke in, daemon work out.

use jukebox_proto::config::Config;
use jukebox_proto::mpd::Connector;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogError, CatalogLoader, Catalogs};
use crate::keys::{on_key, Action, KeyQueue, KeypadLayout};
use crate::mode::{CodeOutcome, Coordinator, ModeError, ModeOptions, PlaybackMode, StationOutcome};
use crate::session::{Session, SessionError, SessionSettings};


/// Everything that changes from keystroke to keystroke.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub mode: PlaybackMode,
    pub keys: KeyQueue,
}

/// What one keystroke ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEffect {
    /// Only the pending digits changed.
    Pending,
    Code(CodeOutcome),
    Station(StationOutcome),
    /// New volume, `None` without a mixer.
    Volume(Option<u8>),
    Skipped(bool),
    Reconnected(bool),
    Ignored,
    /// No daemon to talk to; nothing happened.
    Offline,
    /// The daemon rejected part of the work. Already logged.
    Failed,
}

pub struct Jukebox<C: Connector> {
    session: Session<C>,
    loader: CatalogLoader,
    catalogs: Catalogs,
    state: ControllerState,
    layout: KeypadLayout,
    options: ModeOptions,
    startup_code: Option<String>,
    rng: StdRng,
}

impl<C: Connector> Jukebox<C> {
    pub fn new(config: &Config, connector: C) -> Result<Self, CatalogError> {
        Self::with_rng(config, connector, StdRng::from_entropy())
    }

    pub fn with_rng(config: &Config, connector: C, rng: StdRng) -> Result<Self, CatalogError> {
        let startup_code = Some(config.player.startup_code.clone()).filter(|c| !c.is_empty());
        Ok(Self {
            session: Session::new(connector, SessionSettings::from_config(config)),
            loader: CatalogLoader::new(&config.catalog, &config.keypad)?,
            catalogs: Catalogs::default(),
            state: ControllerState::default(),
            layout: KeypadLayout::from_config(&config.keypad),
            options: ModeOptions {
                shuffle_code: config.keypad.shuffle_code.clone(),
                daemon_shuffle: config.player.daemon_shuffle,
            },
            startup_code,
            rng,
        })
    }

    /// Connect, configure the daemon and load the catalogs. On success the
    /// startup song is queued if the daemon has nothing to play.
    pub fn initialize(&mut self) -> bool {
        let settings = self.session.settings();
        info!("Connecting to {}:{}", settings.host, settings.port);
        if !self.session.ensure_connected(&self.loader, &mut self.catalogs) {
            error!("Could not initialize the jukebox");
            return false;
        }
        self.queue_startup_song();
        true
    }

    fn queue_startup_song(&mut self) {
        let Some(code) = self.startup_code.clone() else {
            return;
        };
        match self.session.queued() {
            Ok(queue) if queue.is_empty() => {}
            Ok(_) => return,
            Err(e) => {
                warn!("Could not check queue for the startup song: {}", e);
                return;
            }
        }
        match self.coordinator().enqueue_song(&code) {
            Ok(CodeOutcome::NoMatch) => debug!("Startup code {} names no song", code),
            Ok(_) => info!("Queued startup song {}", code),
            Err(e) => warn!("Could not queue startup song: {}", e),
        }
    }

    /// Process one keystroke to completion. Errors are logged, never returned.
    pub fn handle_key(&mut self, key: char) -> KeyEffect {
        let action = on_key(&mut self.state.keys, &self.layout, key);
        debug!("Key {:?} -> {:?}", key, action);

        match self.apply(action) {
            Ok(effect) => effect,
            Err(ModeError::Session(SessionError::Unavailable(kind))) => {
                debug!("Key {:?} dropped, daemon unavailable ({})", key, kind);
                KeyEffect::Offline
            }
            Err(e) => {
                warn!("Key {:?} failed: {}", key, e);
                KeyEffect::Failed
            }
        }
    }

    fn apply(&mut self, action: Action) -> Result<KeyEffect, ModeError> {
        match action {
            Action::AppendDigit(_) | Action::Backspace | Action::Reset => {
                debug!("Pending code {:?}", self.state.keys.as_str());
                return Ok(KeyEffect::Pending);
            }
            Action::NoOp(key) => {
                debug!("Ignoring key {:?} (U+{:04X})", key, key as u32);
                return Ok(KeyEffect::Ignored);
            }
            Action::Reconnect => {
                info!("Reinitializing jukebox");
                let ok = self.session.reconnect(&self.loader, &mut self.catalogs);
                return Ok(KeyEffect::Reconnected(ok));
            }
            _ => {}
        }

        if !self.ensure_ready() {
            // An abandoned station gesture must not survive the failure.
            if matches!(&action, Action::EnqueueStation(_)) {
                self.state.keys.clear();
            }
            return Ok(KeyEffect::Offline);
        }

        let effect = match action {
            Action::VolumeUp => KeyEffect::Volume(self.session.volume_up()?),
            Action::VolumeDown => KeyEffect::Volume(self.session.volume_down()?),
            Action::SkipTrack => KeyEffect::Skipped(self.session.skip()?),
            Action::EnqueueCode(code) => {
                let outcome = self.coordinator().dispatch_code(&code)?;
                info!("Code {}: {:?}", code, outcome);
                KeyEffect::Code(outcome)
            }
            Action::EnqueueStation(attempt) => {
                let result = self.coordinator().tune_station(&attempt.code);
                // Only a catalogued code gets as far as the daemon.
                if result.as_ref().map_or(true, |o| o.matched()) {
                    self.state.keys.clear();
                }
                let outcome = result?;
                if outcome.matched() {
                    info!("Station {}: {:?}", attempt.code, outcome);
                } else if attempt.exhausted {
                    info!("No station for {}, giving up", attempt.code);
                }
                KeyEffect::Station(outcome)
            }
            Action::AppendDigit(_)
            | Action::Backspace
            | Action::Reset
            | Action::Reconnect
            | Action::NoOp(_) => KeyEffect::Ignored,
        };
        Ok(effect)
    }

    /// Reconfigure and reload after the connection was lost.
    fn ensure_ready(&mut self) -> bool {
        self.session.is_ready() || self.session.ensure_connected(&self.loader, &mut self.catalogs)
    }

    pub fn shutdown(&mut self) {
        info!("Shutting down");
        self.session.close();
    }

    pub fn mode(&self) -> PlaybackMode {
        self.state.mode
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    fn coordinator(&mut self) -> Coordinator<'_, C> {
        Coordinator {
            mode: &mut self.state.mode,
            session: &mut self.session,
            catalogs: &self.catalogs,
            options: &self.options,
            rng: &mut self.rng,
        }
    }
}
