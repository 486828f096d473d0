//! Blocking client for the playback daemon.
//!
//! ```text
//!   TcpConnector::connect(host, port, timeout)
//!         │
//!         ├── resolve          → NameResolution on failure
//!         ├── connect_timeout  → ConnectionRefused / Io
//!         └── mpd::Client::new → banner check, Protocol on mismatch
//!
//!   MpdClient (Daemon)
//!         └── one mpd::Client call per primitive, errors mapped to MpdError
//! ```
//!
//! `Daemon` is the seam the jukebox core is written against; `Connector`
//! opens one. Every round-trip is bounded by the socket timeouts.

use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::ops::Range;
use std::time::Duration;

use mpd::song::Song;
use mpd::status::State;
use thiserror::Error;
use tracing::{debug, info};

use crate::protocol::{DaemonOption, LsEntry, PlayState, PlaybackStatus};

// ── errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum MpdError {
    #[error("could not resolve daemon host {host}")]
    NameResolution {
        host: String,
        #[source]
        source: Option<io::Error>,
    },
    #[error("connection refused by {addr}")]
    ConnectionRefused { addr: String },
    #[error("daemon i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("daemon rejected the request: {0}")]
    Server(String),
    #[error("daemon protocol error: {0}")]
    Protocol(String),
}

impl From<mpd::error::Error> for MpdError {
    fn from(err: mpd::error::Error) -> Self {
        match err {
            mpd::error::Error::Io(e) => MpdError::Io(e),
            mpd::error::Error::Server(e) => MpdError::Server(e.to_string()),
            other => MpdError::Protocol(other.to_string()),
        }
    }
}

/// Connectivity classes reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NameResolution,
    ConnectionRefused,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::NameResolution => write!(f, "name resolution failure"),
            FailureKind::ConnectionRefused => write!(f, "connection refused"),
            FailureKind::Other => write!(f, "transport or protocol error"),
        }
    }
}

impl MpdError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            MpdError::NameResolution { .. } => FailureKind::NameResolution,
            MpdError::ConnectionRefused { .. } => FailureKind::ConnectionRefused,
            MpdError::Io(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                FailureKind::ConnectionRefused
            }
            _ => FailureKind::Other,
        }
    }
}

// ── seams ─────────────────────────────────────────────────────────────────────

/// The daemon primitives the jukebox relies on.
pub trait Daemon {
    fn status(&mut self) -> Result<PlaybackStatus, MpdError>;
    /// Every playable file in the daemon's database.
    fn list_files(&mut self) -> Result<Vec<String>, MpdError>;
    /// Entries directly under `path` (`""` is the root), as full paths.
    fn list_dir(&mut self, path: &str) -> Result<Vec<LsEntry>, MpdError>;
    /// File references of the live queue, in queue order.
    fn queue(&mut self) -> Result<Vec<String>, MpdError>;
    /// Entries of a stored playlist.
    fn playlist_entries(&mut self, name: &str) -> Result<Vec<String>, MpdError>;
    fn add(&mut self, uri: &str) -> Result<(), MpdError>;
    fn load(&mut self, playlist: &str) -> Result<(), MpdError>;
    fn clear(&mut self) -> Result<(), MpdError>;
    fn delete(&mut self, range: Range<u32>) -> Result<(), MpdError>;
    fn set_volume(&mut self, volume: u8) -> Result<(), MpdError>;
    fn play(&mut self) -> Result<(), MpdError>;
    fn next(&mut self) -> Result<(), MpdError>;
    fn shuffle(&mut self, range: Range<u32>) -> Result<(), MpdError>;
    fn set_option(&mut self, option: DaemonOption, enabled: bool) -> Result<(), MpdError>;
    fn close(&mut self) -> Result<(), MpdError>;
}

/// Opens a fresh daemon connection.
pub trait Connector {
    type Conn: Daemon;

    fn connect(&self, host: &str, port: u16, timeout: Duration) -> Result<Self::Conn, MpdError>;
}

// ── TCP implementation ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Conn = MpdClient;

    fn connect(&self, host: &str, port: u16, timeout: Duration) -> Result<MpdClient, MpdError> {
        MpdClient::connect(host, port, timeout)
    }
}

pub struct MpdClient {
    client: mpd::Client<TcpStream>,
}

impl MpdClient {
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, MpdError> {
        let resolution_failed = |source| MpdError::NameResolution {
            host: host.to_string(),
            source,
        };
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| resolution_failed(Some(e)))?
            .collect();
        if addrs.is_empty() {
            return Err(resolution_failed(None));
        }

        let stream = open_stream(&addrs, timeout).map_err(|e| {
            if e.kind() == io::ErrorKind::ConnectionRefused {
                MpdError::ConnectionRefused {
                    addr: format!("{}:{}", host, port),
                }
            } else {
                MpdError::Io(e)
            }
        })?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;

        let client = mpd::Client::new(stream)?;
        info!("mpd: connected to {}:{} (protocol {:?})", host, port, client.version);
        Ok(Self { client })
    }
}

/// First address that accepts, or the error of the last one tried.
fn open_stream(addrs: &[SocketAddr], timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no address to connect to");
    for addr in addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("mpd: connect {} failed: {}", addr, e);
                last_err = e;
            }
        }
    }
    Err(last_err)
}

fn play_state(state: State) -> PlayState {
    match state {
        State::Play => PlayState::Playing,
        State::Pause => PlayState::Paused,
        State::Stop => PlayState::Stopped,
    }
}

/// The daemon reports `-1` when it has no mixer.
fn mixer_volume(raw: i8) -> Option<u8> {
    u8::try_from(raw).ok().map(|v| v.min(100))
}

fn files_of(songs: Vec<Song>) -> Vec<String> {
    songs.into_iter().map(|song| song.file).collect()
}

fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

impl Daemon for MpdClient {
    fn status(&mut self) -> Result<PlaybackStatus, MpdError> {
        let status = self.client.status()?;
        Ok(PlaybackStatus {
            state: play_state(status.state),
            volume: mixer_volume(status.volume),
            queue_len: status.queue_len,
            song_pos: status.song.map(|place| place.pos),
        })
    }

    fn list_files(&mut self) -> Result<Vec<String>, MpdError> {
        Ok(files_of(self.client.listall()?))
    }

    /// `listfiles` answers with names relative to `path`.
    fn list_dir(&mut self, path: &str) -> Result<Vec<LsEntry>, MpdError> {
        let entries = self.client.listfiles(path)?;
        Ok(entries
            .into_iter()
            .filter_map(|(kind, name)| match kind.as_str() {
                "directory" => Some(LsEntry::Directory(join_path(path, &name))),
                "file" => Some(LsEntry::File(join_path(path, &name))),
                _ => None,
            })
            .collect())
    }

    fn queue(&mut self) -> Result<Vec<String>, MpdError> {
        Ok(files_of(self.client.queue()?))
    }

    fn playlist_entries(&mut self, name: &str) -> Result<Vec<String>, MpdError> {
        Ok(files_of(self.client.playlist(name)?))
    }

    fn add(&mut self, uri: &str) -> Result<(), MpdError> {
        let song = Song {
            file: uri.to_string(),
            ..Default::default()
        };
        self.client.push(song)?;
        Ok(())
    }

    fn load(&mut self, playlist: &str) -> Result<(), MpdError> {
        Ok(self.client.load(playlist, ..)?)
    }

    fn clear(&mut self) -> Result<(), MpdError> {
        Ok(self.client.clear()?)
    }

    fn delete(&mut self, range: Range<u32>) -> Result<(), MpdError> {
        Ok(self.client.delete(range)?)
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), MpdError> {
        Ok(self.client.volume(volume.min(100) as i8)?)
    }

    fn play(&mut self) -> Result<(), MpdError> {
        Ok(self.client.play()?)
    }

    fn next(&mut self) -> Result<(), MpdError> {
        Ok(self.client.next()?)
    }

    fn shuffle(&mut self, range: Range<u32>) -> Result<(), MpdError> {
        Ok(self.client.shuffle(range)?)
    }

    fn set_option(&mut self, option: DaemonOption, enabled: bool) -> Result<(), MpdError> {
        debug!("mpd: {} {}", option.command(), enabled);
        match option {
            DaemonOption::Consume => self.client.consume(enabled)?,
            DaemonOption::Single => self.client.single(enabled)?,
            DaemonOption::Repeat => self.client.repeat(enabled)?,
            DaemonOption::Random => self.client.random(enabled)?,
        }
        Ok(())
    }

    /// The daemon hangs up on `close` without replying, so a dead socket
    /// afterwards is expected.
    fn close(&mut self) -> Result<(), MpdError> {
        match self.client.close() {
            Ok(()) | Err(mpd::error::Error::Io(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
