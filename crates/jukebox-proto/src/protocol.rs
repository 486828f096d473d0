//! Value types exchanged with the playback daemon.
//!
//! The wire protocol itself is handled by the `mpd` crate; these are the
//! narrow views of its replies that the jukebox core works with.

/// Playback state as reported by `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

/// Snapshot of the daemon returned by one `status` round-trip.
///
/// Never cached: every caller that depends on it asks again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaybackStatus {
    pub state: PlayState,
    /// `None` when the daemon has no mixer.
    pub volume: Option<u8>,
    pub queue_len: u32,
    /// Queue position of the current song.
    pub song_pos: Option<u32>,
}

impl PlaybackStatus {
    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }
}

/// One entry of a directory listing, named by its full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LsEntry {
    Directory(String),
    File(String),
}

/// Per-connection daemon flags the jukebox pins on connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonOption {
    Consume,
    Single,
    Repeat,
    Random,
}

impl DaemonOption {
    pub fn command(self) -> &'static str {
        match self {
            DaemonOption::Consume => "consume",
            DaemonOption::Single => "single",
            DaemonOption::Repeat => "repeat",
            DaemonOption::Random => "random",
        }
    }
}
