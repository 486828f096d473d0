//! Owner of the single daemon connection.
//!
//! The connection is opened lazily, probed with `status` before reuse and
//! dropped on the first failed primitive. There is no background reconnect:
//! the next `get_status` makes exactly one fresh attempt.

use std::ops::Range;
use std::time::Duration;

use jukebox_proto::config::Config;
use jukebox_proto::mpd::{Connector, Daemon, FailureKind, MpdError};
use jukebox_proto::protocol::{DaemonOption, LsEntry, PlaybackStatus};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogLoader, Catalogs};

#[derive(Debug, Error)]
pub enum SessionError {
    /// No status could be obtained; the connection is gone.
    #[error("daemon unavailable ({0})")]
    Unavailable(FailureKind),
    /// A primitive failed on a live connection, which has been torn down.
    #[error(transparent)]
    Daemon(#[from] MpdError),
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub volume_ceiling: u8,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.daemon.host.clone(),
            port: config.daemon.port,
            timeout: config.daemon.timeout(),
            volume_ceiling: config.player.volume_ceiling,
        }
    }
}

pub struct Session<C: Connector> {
    connector: C,
    settings: SessionSettings,
    conn: Option<C::Conn>,
    /// Jukebox daemon options have been applied to the current connection.
    configured: bool,
}

impl<C: Connector> Session<C> {
    pub fn new(connector: C, settings: SessionSettings) -> Self {
        Self {
            connector,
            settings,
            conn: None,
            configured: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Connected, with the jukebox daemon settings applied.
    pub fn is_ready(&self) -> bool {
        self.conn.is_some() && self.configured
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Fetch a fresh status, reconnecting once if the current connection is
    /// dead or missing.
    pub fn get_status(&mut self) -> Result<PlaybackStatus, SessionError> {
        if let Some(conn) = self.conn.as_mut() {
            match conn.status() {
                Ok(status) => return Ok(status),
                Err(e) => {
                    debug!("session: liveness probe failed: {}", e);
                    self.drop_connection();
                }
            }
        }

        let mut conn =
            match self
                .connector
                .connect(&self.settings.host, self.settings.port, self.settings.timeout)
            {
                Ok(conn) => conn,
                Err(e) => return Err(self.unavailable(e)),
            };

        match conn.status() {
            Ok(status) => {
                info!(
                    "session: connected to {}:{}",
                    self.settings.host, self.settings.port
                );
                self.conn = Some(conn);
                self.configured = false;
                Ok(status)
            }
            Err(e) => {
                let _ = conn.close();
                Err(self.unavailable(e))
            }
        }
    }

    fn unavailable(&self, e: MpdError) -> SessionError {
        let kind = e.failure_kind();
        match kind {
            FailureKind::NameResolution => error!(
                "session: could not resolve {}, does the server name exist? ({})",
                self.settings.host, e
            ),
            FailureKind::ConnectionRefused => error!(
                "session: connection to {}:{} refused, is the port open?",
                self.settings.host, self.settings.port
            ),
            FailureKind::Other => error!("session: daemon unavailable: {}", e),
        }
        SessionError::Unavailable(kind)
    }

    fn drop_connection(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = conn.close() {
                debug!("session: close failed: {}", e);
            }
        }
        self.configured = false;
    }

    /// Run one primitive on the connection. Any failure tears it down.
    fn with_conn<T>(
        &mut self,
        op: &str,
        f: impl FnOnce(&mut C::Conn) -> Result<T, MpdError>,
    ) -> Result<T, SessionError> {
        if self.conn.is_none() {
            self.get_status()?;
        }
        let result = match self.conn.as_mut() {
            Some(conn) => f(conn),
            None => return Err(SessionError::Unavailable(FailureKind::Other)),
        };
        result.map_err(|e| {
            warn!("session: {} failed, dropping connection: {}", op, e);
            self.drop_connection();
            SessionError::Daemon(e)
        })
    }

    /// Make sure a configured connection exists and reload the catalogs.
    ///
    /// `catalogs` is only replaced when the reload succeeds.
    pub fn ensure_connected(&mut self, loader: &CatalogLoader, catalogs: &mut Catalogs) -> bool {
        debug!(
            "session: checking connection to {}:{}",
            self.settings.host, self.settings.port
        );
        let status = match self.get_status() {
            Ok(status) => status,
            Err(_) => return false,
        };
        debug!(
            "session: volume {:?}, {} songs in queue",
            status.volume, status.queue_len
        );

        if !self.configured {
            if let Err(e) = self.configure(&status) {
                warn!("session: could not apply jukebox settings: {}", e);
                return false;
            }
            self.configured = true;
        }

        match loader.load(self) {
            Ok(loaded) => {
                *catalogs = loaded;
                true
            }
            Err(e) => {
                warn!(
                    "session: catalog reload failed, keeping {} songs and {} stations: {}",
                    catalogs.songs.len(),
                    catalogs.stations.len(),
                    e
                );
                false
            }
        }
    }

    fn configure(&mut self, status: &PlaybackStatus) -> Result<(), SessionError> {
        self.with_conn("configure", |conn| {
            conn.set_option(DaemonOption::Consume, true)?;
            conn.set_option(DaemonOption::Single, false)?;
            conn.set_option(DaemonOption::Random, false)?;
            conn.set_option(DaemonOption::Repeat, false)
        })?;

        let ceiling = self.settings.volume_ceiling;
        if status.volume.is_some_and(|v| v > ceiling) {
            info!("session: clamping volume to {}", ceiling);
            self.with_conn("setvol", |conn| conn.set_volume(ceiling))?;
        }
        if !status.is_playing() {
            self.with_conn("play", |conn| conn.play())?;
        }
        Ok(())
    }

    /// Close and reopen, reapplying settings and reloading catalogs.
    pub fn reconnect(&mut self, loader: &CatalogLoader, catalogs: &mut Catalogs) -> bool {
        self.close();
        self.ensure_connected(loader, catalogs)
    }

    /// Safe to call without a connection.
    pub fn close(&mut self) {
        if self.conn.is_some() {
            info!("session: closing connection");
        }
        self.drop_connection();
    }

    // ── queue ─────────────────────────────────────────────────────────────────

    /// References in the live queue, fetched fresh.
    pub fn queued(&mut self) -> Result<Vec<String>, SessionError> {
        let status = self.get_status()?;
        if status.queue_len == 0 {
            return Ok(Vec::new());
        }
        self.with_conn("playlistinfo", |conn| conn.queue())
    }

    /// Append `reference` unless the live queue already holds it, then make
    /// sure something is playing. `Ok(false)` means it was already queued.
    pub fn enqueue(&mut self, reference: &str) -> Result<bool, SessionError> {
        let status = self.get_status()?;
        if status.queue_len > 0 {
            let queue = self.with_conn("playlistinfo", |conn| conn.queue())?;
            if queue.iter().any(|queued| queued == reference) {
                info!("Did not queue {} because it's already in queue", reference);
                return Ok(false);
            }
        }

        debug!("Enqueuing {}", reference);
        self.with_conn("add", |conn| conn.add(reference))?;
        if !status.is_playing() {
            self.with_conn("play", |conn| conn.play())?;
        }
        Ok(true)
    }

    /// Append without the duplicate check or playback side effects.
    pub fn append(&mut self, reference: &str) -> Result<(), SessionError> {
        self.with_conn("add", |conn| conn.add(reference))
    }

    pub fn clear_queue(&mut self) -> Result<(), SessionError> {
        self.with_conn("clear", |conn| conn.clear())
    }

    pub fn delete_range(&mut self, range: Range<u32>) -> Result<(), SessionError> {
        self.with_conn("delete", |conn| conn.delete(range))
    }

    pub fn load_playlist(&mut self, name: &str) -> Result<(), SessionError> {
        self.with_conn("load", |conn| conn.load(name))
    }

    pub fn shuffle_queue(&mut self, range: Range<u32>) -> Result<(), SessionError> {
        self.with_conn("shuffle", |conn| conn.shuffle(range))
    }

    pub fn playlist_entries(&mut self, name: &str) -> Result<Vec<String>, SessionError> {
        self.with_conn("listplaylist", |conn| conn.playlist_entries(name))
    }

    pub fn list_files(&mut self) -> Result<Vec<String>, SessionError> {
        self.with_conn("listall", |conn| conn.list_files())
    }

    pub fn list_dir(&mut self, path: &str) -> Result<Vec<LsEntry>, SessionError> {
        self.with_conn("listfiles", |conn| conn.list_dir(path))
    }

    // ── playback ──────────────────────────────────────────────────────────────

    /// Start playback unless already playing.
    pub fn play(&mut self) -> Result<(), SessionError> {
        let status = self.get_status()?;
        if !status.is_playing() {
            self.with_conn("play", |conn| conn.play())?;
        }
        Ok(())
    }

    /// Skip to the next track. Only acts while playing.
    pub fn skip(&mut self) -> Result<bool, SessionError> {
        let status = self.get_status()?;
        if !status.is_playing() {
            debug!("Not playing, nothing to skip");
            return Ok(false);
        }
        info!("Skipping song");
        self.with_conn("next", |conn| conn.next())?;
        Ok(true)
    }

    /// Set an absolute volume, clamped to the ceiling.
    pub fn set_volume(&mut self, volume: u8) -> Result<u8, SessionError> {
        let volume = volume.min(self.settings.volume_ceiling);
        self.with_conn("setvol", |conn| conn.set_volume(volume))?;
        Ok(volume)
    }

    pub fn volume_up(&mut self) -> Result<Option<u8>, SessionError> {
        self.step_volume(true)
    }

    pub fn volume_down(&mut self) -> Result<Option<u8>, SessionError> {
        self.step_volume(false)
    }

    /// Move the live volume by one, saturating at 0 and at the ceiling.
    /// `None` when the daemon has no mixer.
    fn step_volume(&mut self, up: bool) -> Result<Option<u8>, SessionError> {
        let status = self.get_status()?;
        let Some(current) = status.volume else {
            warn!("Daemon reports no mixer, ignoring volume key");
            return Ok(None);
        };

        let ceiling = self.settings.volume_ceiling;
        let target = if up {
            current.saturating_add(1).min(ceiling)
        } else {
            current.saturating_sub(1).min(ceiling)
        };
        if target != current {
            info!("Changing volume {} -> {}", current, target);
            self.with_conn("setvol", |conn| conn.set_volume(target))?;
        }
        Ok(Some(target))
    }
}
