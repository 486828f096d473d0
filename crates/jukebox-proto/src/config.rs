use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub keypad: KeypadConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Where the playback daemon lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bound on each connect/read/write.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Volume keys never go above this; a louder daemon is clamped on connect.
    #[serde(default = "default_volume_ceiling")]
    pub volume_ceiling: u8,
    /// Song enqueued after connecting when the queue is empty.  Empty disables.
    #[serde(default = "default_startup_code")]
    pub startup_code: String,
    /// Let the daemon shuffle the songs appended for shuffle-all instead of
    /// appending them in a locally drawn order.
    #[serde(default)]
    pub daemon_shuffle: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeypadConfig {
    #[serde(default = "default_song_code_width")]
    pub song_code_width: usize,
    /// Leading digit that turns a gesture into a station selection.
    #[serde(default = "default_station_prefix")]
    pub station_prefix: char,
    /// A station gesture gives up after the prefix plus this many digits.
    #[serde(default = "default_station_code_max_width")]
    pub station_code_max_width: usize,
    /// Code that toggles shuffle-all instead of naming a song.
    #[serde(default = "default_shuffle_code")]
    pub shuffle_code: String,
}

/// Naming convention the daemon's library follows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Leading path component of keypad-addressable songs (removable storage).
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,
    #[serde(default = "default_song_extensions")]
    pub song_extensions: Vec<String>,
    /// Directory holding one playlist per radio station.
    #[serde(default = "default_station_dir")]
    pub station_dir: String,
    #[serde(default = "default_station_extension")]
    pub station_extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Log file; empty means `jukebox.log` in the data directory.
    #[serde(default)]
    pub file: PathBuf,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume_ceiling: default_volume_ceiling(),
            startup_code: default_startup_code(),
            daemon_shuffle: false,
        }
    }
}

impl Default for KeypadConfig {
    fn default() -> Self {
        Self {
            song_code_width: default_song_code_width(),
            station_prefix: default_station_prefix(),
            station_code_max_width: default_station_code_max_width(),
            shuffle_code: default_shuffle_code(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            storage_prefix: default_storage_prefix(),
            song_extensions: default_song_extensions(),
            station_dir: default_station_dir(),
            station_extension: default_station_extension(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: PathBuf::new(),
        }
    }
}

fn default_host() -> String {
    platform::DEFAULT_DAEMON_HOST.to_string()
}

fn default_port() -> u16 {
    platform::DEFAULT_DAEMON_PORT
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_volume_ceiling() -> u8 {
    35
}

fn default_startup_code() -> String {
    "000".to_string()
}

fn default_song_code_width() -> usize {
    3
}

fn default_station_prefix() -> char {
    '9'
}

fn default_station_code_max_width() -> usize {
    4
}

fn default_shuffle_code() -> String {
    "777".to_string()
}

fn default_storage_prefix() -> String {
    "USB".to_string()
}

fn default_song_extensions() -> Vec<String> {
    vec!["mp3".to_string()]
}

fn default_station_dir() -> String {
    "RADIO".to_string()
}

fn default_station_extension() -> String {
    "pls".to_string()
}

fn default_log_filter() -> String {
    "debug".to_string()
}

impl DaemonConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl LogConfig {
    pub fn log_path(&self) -> PathBuf {
        if self.file.as_os_str().is_empty() {
            platform::data_dir().join("jukebox.log")
        } else {
            self.file.clone()
        }
    }
}

fn is_code(code: &str, width: usize) -> bool {
    code.len() == width && code.bytes().all(|b| b.is_ascii_digit())
}

impl Config {
    /// Load the default config file, writing one with defaults if it is missing.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load an explicitly named config file; it must exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let keypad = &self.keypad;
        if self.daemon.port == 0 {
            anyhow::bail!("daemon.port must be non-zero");
        }
        if keypad.song_code_width == 0 {
            anyhow::bail!("keypad.song_code_width must be at least 1");
        }
        if !keypad.station_prefix.is_ascii_digit() {
            anyhow::bail!(
                "keypad.station_prefix must be a single digit, got {:?}",
                keypad.station_prefix
            );
        }
        if keypad.station_code_max_width < keypad.song_code_width {
            anyhow::bail!(
                "keypad.station_code_max_width ({}) is shorter than keypad.song_code_width ({})",
                keypad.station_code_max_width,
                keypad.song_code_width
            );
        }
        if !is_code(&keypad.shuffle_code, keypad.song_code_width) {
            anyhow::bail!(
                "keypad.shuffle_code {:?} is not a {}-digit code",
                keypad.shuffle_code,
                keypad.song_code_width
            );
        }
        let startup = &self.player.startup_code;
        if !startup.is_empty() && !is_code(startup, keypad.song_code_width) {
            anyhow::bail!(
                "player.startup_code {:?} is not a {}-digit code",
                startup,
                keypad.song_code_width
            );
        }
        if self.player.volume_ceiling > 100 {
            anyhow::bail!("player.volume_ceiling must be at most 100");
        }
        if self.catalog.song_extensions.is_empty() {
            anyhow::bail!("catalog.song_extensions must name at least one extension");
        }
        Ok(())
    }
}
