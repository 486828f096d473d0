//! In-memory daemon shared by the unit tests of the core.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::ops::Range;
use std::rc::Rc;
use std::time::Duration;

use jukebox_proto::config::{CatalogConfig, KeypadConfig};
use jukebox_proto::mpd::{Connector, Daemon, FailureKind, MpdError};
use jukebox_proto::protocol::{DaemonOption, LsEntry, PlayState, PlaybackStatus};

use crate::catalog::CatalogLoader;
use crate::session::{Session, SessionSettings};

pub const STARTUP_SONG: &str = "USB/sda1/000-Welcome.mp3";
pub const SONG_A: &str = "USB/sda1/001-Alpha.mp3";
pub const SONG_B: &str = "USB/sda1/002-Bravo.mp3";
pub const SONG_C: &str = "USB/sda1/003-Charlie.mp3";
pub const SONG_D: &str = "USB/sda1/albums/004-Delta.mp3";
pub const STATION_KIRO: &str = "RADIO/710-KIRO.pls";
pub const STATION_JAZZ: &str = "RADIO/1053-Jazz.pls";
pub const KIRO_STREAM: &str = "http://radio.example/kiro.aac";

#[derive(Debug, Default)]
pub struct FakeState {
    pub files: Vec<String>,
    pub root: Vec<LsEntry>,
    pub dirs: HashMap<String, Vec<LsEntry>>,
    pub playlists: HashMap<String, Vec<String>>,
    pub queue: Vec<String>,
    pub play_state: PlayState,
    /// Queue position of the current song.
    pub current: Option<u32>,
    pub volume: Option<u8>,
    pub options: HashMap<String, bool>,

    pub connects: usize,
    pub closes: usize,
    /// Every primitive, rendered as `name arg arg`.
    pub commands: Vec<String>,

    pub unreachable: Option<FailureKind>,
    /// Primitive name that fails with a broken pipe.
    pub fail_on: Option<&'static str>,
    pub fail_status_once: bool,
}

impl FakeState {
    /// Five keyable songs, two stations, an empty stopped queue.
    pub fn library() -> Self {
        let mut state = Self {
            files: [
                STARTUP_SONG,
                SONG_A,
                SONG_B,
                SONG_C,
                SONG_D,
                "USB/sda1/readme.txt",
                "Music/010-Elsewhere.mp3",
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
            root: vec![
                LsEntry::Directory("Music".into()),
                LsEntry::Directory("RADIO".into()),
                LsEntry::Directory("USB".into()),
            ],
            volume: Some(20),
            ..Self::default()
        };
        state.dirs.insert(
            "RADIO".into(),
            vec![
                LsEntry::File(STATION_KIRO.into()),
                LsEntry::File(STATION_JAZZ.into()),
            ],
        );
        state
            .playlists
            .insert(STATION_KIRO.into(), vec![KIRO_STREAM.into()]);
        state.playlists.insert(
            STATION_JAZZ.into(),
            vec![
                "http://radio.example/jazz-hi.mp3".into(),
                "http://radio.example/jazz-lo.mp3".into(),
            ],
        );
        state
    }

    pub fn count(&self, name: &str) -> usize {
        self.commands
            .iter()
            .filter(|c| c.split(' ').next() == Some(name))
            .count()
    }

    fn status(&self) -> PlaybackStatus {
        let song_pos = match self.play_state {
            PlayState::Stopped => None,
            _ if self.queue.is_empty() => None,
            _ => Some(self.current.unwrap_or(0)),
        };
        PlaybackStatus {
            state: self.play_state,
            volume: self.volume,
            queue_len: self.queue.len() as u32,
            song_pos,
        }
    }

    fn stop(&mut self) {
        self.play_state = PlayState::Stopped;
        self.current = None;
    }
}

fn no_such(command: &str, what: &str) -> MpdError {
    MpdError::Server(format!("[50@0] {{{}}} No such {}", command, what))
}

pub struct FakeDaemon {
    state: Rc<RefCell<FakeState>>,
}

impl FakeDaemon {
    fn record(&self, name: &str, args: &[String]) -> Result<(), MpdError> {
        let mut state = self.state.borrow_mut();
        let line = std::iter::once(name.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        state.commands.push(line);
        if state.fail_on == Some(name) {
            return Err(MpdError::Io(io::Error::from(io::ErrorKind::BrokenPipe)));
        }
        Ok(())
    }
}

impl Daemon for FakeDaemon {
    fn status(&mut self) -> Result<PlaybackStatus, MpdError> {
        self.record("status", &[])?;
        let mut state = self.state.borrow_mut();
        if state.fail_status_once {
            state.fail_status_once = false;
            return Err(MpdError::Io(io::Error::from(io::ErrorKind::TimedOut)));
        }
        Ok(state.status())
    }

    fn list_files(&mut self) -> Result<Vec<String>, MpdError> {
        self.record("listall", &[])?;
        Ok(self.state.borrow().files.clone())
    }

    fn list_dir(&mut self, path: &str) -> Result<Vec<LsEntry>, MpdError> {
        let args = if path.is_empty() { vec![] } else { vec![path.to_string()] };
        self.record("listfiles", &args)?;
        let state = self.state.borrow();
        if path.is_empty() {
            return Ok(state.root.clone());
        }
        state
            .dirs
            .get(path)
            .cloned()
            .ok_or_else(|| no_such("listfiles", "directory"))
    }

    fn queue(&mut self) -> Result<Vec<String>, MpdError> {
        self.record("playlistinfo", &[])?;
        Ok(self.state.borrow().queue.clone())
    }

    fn playlist_entries(&mut self, name: &str) -> Result<Vec<String>, MpdError> {
        self.record("listplaylist", &[name.to_string()])?;
        self.state
            .borrow()
            .playlists
            .get(name)
            .cloned()
            .ok_or_else(|| no_such("listplaylist", "playlist"))
    }

    fn add(&mut self, uri: &str) -> Result<(), MpdError> {
        self.record("add", &[uri.to_string()])?;
        let mut state = self.state.borrow_mut();
        if !state.files.iter().any(|f| f == uri) {
            return Err(no_such("add", "file"));
        }
        state.queue.push(uri.to_string());
        Ok(())
    }

    fn load(&mut self, playlist: &str) -> Result<(), MpdError> {
        self.record("load", &[playlist.to_string()])?;
        let mut state = self.state.borrow_mut();
        let entries = state
            .playlists
            .get(playlist)
            .cloned()
            .ok_or_else(|| no_such("load", "playlist"))?;
        state.queue.extend(entries);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), MpdError> {
        self.record("clear", &[])?;
        let mut state = self.state.borrow_mut();
        state.queue.clear();
        state.stop();
        Ok(())
    }

    fn delete(&mut self, range: Range<u32>) -> Result<(), MpdError> {
        self.record("delete", &[format!("{}:{}", range.start, range.end)])?;
        let mut state = self.state.borrow_mut();
        let len = state.queue.len() as u32;
        if range.start > range.end || range.end > len {
            return Err(MpdError::Server("[2@0] {delete} Bad song index".into()));
        }
        state
            .queue
            .drain(range.start as usize..range.end as usize);
        let current = state.current;
        match current {
            Some(pos) if range.contains(&pos) => state.stop(),
            Some(pos) if pos >= range.end => state.current = Some(pos - (range.end - range.start)),
            _ => {}
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), MpdError> {
        self.record("setvol", &[volume.to_string()])?;
        let mut state = self.state.borrow_mut();
        if state.volume.is_none() {
            return Err(MpdError::Server("[52@0] {setvol} problems setting volume".into()));
        }
        state.volume = Some(volume);
        Ok(())
    }

    fn play(&mut self) -> Result<(), MpdError> {
        self.record("play", &[])?;
        let mut state = self.state.borrow_mut();
        if !state.queue.is_empty() {
            let current = state.current.unwrap_or(0);
            state.play_state = PlayState::Playing;
            state.current = Some(current);
        }
        Ok(())
    }

    fn next(&mut self) -> Result<(), MpdError> {
        self.record("next", &[])?;
        let mut state = self.state.borrow_mut();
        let pos = state.current.unwrap_or(0) as usize;
        let consume = state.options.get("consume").copied().unwrap_or(false);
        if consume && pos < state.queue.len() {
            state.queue.remove(pos);
        } else {
            state.current = Some(pos as u32 + 1);
        }
        if state.current.unwrap_or(0) as usize >= state.queue.len() {
            state.stop();
        }
        Ok(())
    }

    fn shuffle(&mut self, range: Range<u32>) -> Result<(), MpdError> {
        self.record("shuffle", &[format!("{}:{}", range.start, range.end)])?;
        let mut state = self.state.borrow_mut();
        let end = (range.end as usize).min(state.queue.len());
        let start = (range.start as usize).min(end);
        // Deterministic stand-in for the daemon's shuffle.
        state.queue[start..end].reverse();
        Ok(())
    }

    fn set_option(&mut self, option: DaemonOption, enabled: bool) -> Result<(), MpdError> {
        let flag = if enabled { "1" } else { "0" };
        self.record(option.command(), &[flag.to_string()])?;
        self.state
            .borrow_mut()
            .options
            .insert(option.command().to_string(), enabled);
        Ok(())
    }

    fn close(&mut self) -> Result<(), MpdError> {
        self.state.borrow_mut().closes += 1;
        Ok(())
    }
}

pub struct FakeConnector {
    state: Rc<RefCell<FakeState>>,
}

impl Connector for FakeConnector {
    type Conn = FakeDaemon;

    fn connect(&self, host: &str, port: u16, _timeout: Duration) -> Result<FakeDaemon, MpdError> {
        let mut state = self.state.borrow_mut();
        match state.unreachable {
            Some(FailureKind::NameResolution) => {
                return Err(MpdError::NameResolution {
                    host: host.to_string(),
                    source: None,
                })
            }
            Some(FailureKind::ConnectionRefused) => {
                return Err(MpdError::ConnectionRefused {
                    addr: format!("{}:{}", host, port),
                })
            }
            Some(FailureKind::Other) => {
                return Err(MpdError::Protocol("unexpected greeting".into()))
            }
            None => {}
        }
        state.connects += 1;
        Ok(FakeDaemon {
            state: Rc::clone(&self.state),
        })
    }
}

pub fn connector(state: FakeState) -> (FakeConnector, Rc<RefCell<FakeState>>) {
    let state = Rc::new(RefCell::new(state));
    (
        FakeConnector {
            state: Rc::clone(&state),
        },
        state,
    )
}

pub fn settings() -> SessionSettings {
    SessionSettings {
        host: "jukebox.test".into(),
        port: 6600,
        timeout: Duration::from_millis(100),
        volume_ceiling: 35,
    }
}

pub fn fake_session(state: FakeState) -> (Session<FakeConnector>, Rc<RefCell<FakeState>>) {
    let (connector, state) = connector(state);
    (Session::new(connector, settings()), state)
}

pub fn loader() -> CatalogLoader {
    CatalogLoader::new(&CatalogConfig::default(), &KeypadConfig::default())
        .expect("default naming convention compiles")
}
