//! Numeric-code catalogs built from the daemon's library listing.
//!
//! Songs follow `<storage prefix>…/<code>-<title>.<ext>`; stations are
//! playlist files named `<station dir>/<code>-<name>.<ext>`. Anything else in
//! the library is invisible to the keypad.

use std::collections::BTreeMap;

use jukebox_proto::config::{CatalogConfig, KeypadConfig};
use jukebox_proto::mpd::Connector;
use jukebox_proto::protocol::LsEntry;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::session::{Session, SessionError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog naming pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Fixed-width code → media reference. Leading zeros are significant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaCatalog {
    entries: BTreeMap<String, String>,
}

impl MediaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the reference previously stored under `code`, if any.
    pub fn insert(&mut self, code: impl Into<String>, reference: impl Into<String>) -> Option<String> {
        self.entries.insert(code.into(), reference.into())
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, r)| (c.as_str(), r.as_str()))
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }
}

impl<C: Into<String>, R: Into<String>> FromIterator<(C, R)> for MediaCatalog {
    fn from_iter<I: IntoIterator<Item = (C, R)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (code, reference) in iter {
            catalog.insert(code, reference);
        }
        catalog
    }
}

/// The two catalogs of one connection. Replaced as a whole on reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalogs {
    pub songs: MediaCatalog,
    pub stations: MediaCatalog,
}

pub struct CatalogLoader {
    song_pattern: Regex,
    station_pattern: Regex,
    station_dir: String,
    station_prefix: char,
    shuffle_code: String,
}

impl CatalogLoader {
    pub fn new(catalog: &CatalogConfig, keypad: &KeypadConfig) -> Result<Self, CatalogError> {
        let extensions = catalog
            .song_extensions
            .iter()
            .map(|ext| regex::escape(ext))
            .collect::<Vec<_>>()
            .join("|");
        let song_pattern = Regex::new(&format!(
            r"^{}.+/(\d{{{}}})-.*\.(?:{})$",
            regex::escape(&catalog.storage_prefix),
            keypad.song_code_width,
            extensions
        ))?;
        let station_pattern = Regex::new(&format!(
            r"^{}/(\d{{{},{}}})-.*\.{}$",
            regex::escape(&catalog.station_dir),
            keypad.song_code_width,
            keypad.station_code_max_width,
            regex::escape(&catalog.station_extension)
        ))?;

        Ok(Self {
            song_pattern,
            station_pattern,
            station_dir: catalog.station_dir.clone(),
            station_prefix: keypad.station_prefix,
            shuffle_code: keypad.shuffle_code.clone(),
        })
    }

    /// Query the daemon and build both catalogs.
    ///
    /// On error nothing is returned, so whatever the caller held stays in place.
    pub fn load<C: Connector>(&self, session: &mut Session<C>) -> Result<Catalogs, SessionError> {
        let files = session.list_files()?;
        let songs = self.songs_from(&files);
        info!("Found {} jukebox songs", songs.len());

        let root = session.list_dir("")?;
        let has_station_dir = root
            .iter()
            .any(|entry| matches!(entry, LsEntry::Directory(dir) if *dir == self.station_dir));
        let stations = if has_station_dir {
            let entries = session.list_dir(&self.station_dir)?;
            let stations = self.stations_from(&entries);
            for (short, long) in shadowed_stations(&stations) {
                warn!(
                    "Station {} can never be tuned: {} is tuned first once its digits are entered",
                    long, short
                );
            }
            stations
        } else {
            debug!("No {} directory, radio disabled", self.station_dir);
            MediaCatalog::new()
        };
        info!("Found {} radio stations", stations.len());

        Ok(Catalogs { songs, stations })
    }

    pub fn songs_from(&self, files: &[String]) -> MediaCatalog {
        let mut songs = MediaCatalog::new();
        for file in files {
            let Some(code) = capture_code(&self.song_pattern, file) else {
                continue;
            };
            if code.starts_with(self.station_prefix) {
                warn!(
                    "Song {} starts with the station prefix {} and cannot be keyed",
                    file, self.station_prefix
                );
            } else if code == self.shuffle_code {
                warn!("Song {} uses the shuffle code and cannot be keyed", file);
            }
            if let Some(previous) = songs.insert(code.clone(), file.clone()) {
                warn!("Code {} used by both {} and {}, keeping the latter", code, previous, file);
            }
        }
        songs
    }

    pub fn stations_from(&self, entries: &[LsEntry]) -> MediaCatalog {
        let mut stations = MediaCatalog::new();
        for entry in entries {
            let LsEntry::File(playlist) = entry else {
                continue;
            };
            let Some(code) = capture_code(&self.station_pattern, playlist) else {
                continue;
            };
            if let Some(previous) = stations.insert(code.clone(), playlist.clone()) {
                warn!(
                    "Station code {} used by both {} and {}, keeping the latter",
                    code, previous, playlist
                );
            }
        }
        stations
    }
}

/// `(shorter, longer)` code pairs where the shorter station code leads the
/// longer one. Stations are looked up after every digit, so the longer
/// station is unreachable from the keypad.
pub fn shadowed_stations(stations: &MediaCatalog) -> Vec<(String, String)> {
    let mut shadowed = Vec::new();
    for (long, _) in stations.iter() {
        if let Some((short, _)) = stations
            .iter()
            .find(|(short, _)| short.len() < long.len() && long.starts_with(short))
        {
            shadowed.push((short.to_string(), long.to_string()));
        }
    }
    shadowed
}

fn capture_code(pattern: &Regex, path: &str) -> Option<String> {
    pattern
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_session, FakeState};

    fn loader() -> CatalogLoader {
        CatalogLoader::new(&CatalogConfig::default(), &KeypadConfig::default()).unwrap()
    }

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_songs_follow_naming_convention() {
        let songs = loader().songs_from(&files(&[
            "USB/sda1/001-Alpha.mp3",
            "USB/sda1/albums/042-Deep Cut.mp3",
            "USB/sda1/0001-Too Wide.mp3",
            "USB/sda1/01-Too Narrow.mp3",
            "USB/sda1/003-Wrong Extension.flac",
            "Music/sda1/004-Not On Storage.mp3",
            "USB/005-No Subdirectory.mp3",
        ]));
        assert_eq!(songs.len(), 2);
        assert_eq!(songs.get("001"), Some("USB/sda1/001-Alpha.mp3"));
        assert_eq!(songs.get("042"), Some("USB/sda1/albums/042-Deep Cut.mp3"));
        assert!(!songs.contains("004"));
    }

    #[test]
    fn test_duplicate_code_keeps_last() {
        let songs = loader().songs_from(&files(&["USB/a/007-One.mp3", "USB/b/007-Two.mp3"]));
        assert_eq!(songs.len(), 1);
        assert_eq!(songs.get("007"), Some("USB/b/007-Two.mp3"));
    }

    #[test]
    fn test_extra_extensions() {
        let catalog = CatalogConfig {
            song_extensions: vec!["mp3".into(), "flac".into()],
            ..CatalogConfig::default()
        };
        let loader = CatalogLoader::new(&catalog, &KeypadConfig::default()).unwrap();
        let songs = loader.songs_from(&files(&["USB/x/003-Lossless.flac", "USB/x/004-Ogg.ogg"]));
        assert_eq!(songs.len(), 1);
        assert!(songs.contains("003"));
    }

    #[test]
    fn test_stations_take_three_or_four_digit_codes() {
        let stations = loader().stations_from(&[
            LsEntry::File("RADIO/710-KIRO.pls".into()),
            LsEntry::File("RADIO/1000-KOMO.pls".into()),
            LsEntry::File("RADIO/12345-Too Long.pls".into()),
            LsEntry::File("RADIO/929-KISM.m3u".into()),
            LsEntry::File("RADIO/notes.txt".into()),
            LsEntry::Directory("RADIO/965-JACK.pls".into()),
        ]);
        assert_eq!(stations.len(), 2);
        assert_eq!(stations.get("710"), Some("RADIO/710-KIRO.pls"));
        assert_eq!(stations.get("1000"), Some("RADIO/1000-KOMO.pls"));
    }

    #[test]
    fn test_prefix_codes_are_flagged_as_shadowed() {
        let stations = loader().stations_from(&[
            LsEntry::File("RADIO/710-KIRO.pls".into()),
            LsEntry::File("RADIO/7105-Deep Jazz.pls".into()),
            LsEntry::File("RADIO/1053-Jazz.pls".into()),
            LsEntry::File("RADIO/105-Other.pls".into()),
            LsEntry::File("RADIO/929-KISM.pls".into()),
        ]);
        assert_eq!(stations.len(), 5);
        assert!(stations.contains("7105"));
        assert_eq!(
            shadowed_stations(&stations),
            vec![
                ("105".to_string(), "1053".to_string()),
                ("710".to_string(), "7105".to_string()),
            ]
        );
    }

    #[test]
    fn test_distinct_codes_are_not_shadowed() {
        let stations: MediaCatalog = [("710", "a"), ("0710", "b"), ("1000", "c"), ("100", "d")]
            .into_iter()
            .collect();
        assert_eq!(
            shadowed_stations(&stations),
            vec![("100".to_string(), "1000".to_string())]
        );
    }

    #[test]
    fn test_load_from_daemon() {
        let (mut session, state) = fake_session(FakeState::library());
        let catalogs = loader().load(&mut session).unwrap();
        assert_eq!(catalogs.songs.len(), 5);
        assert_eq!(catalogs.stations.len(), 2);
        assert!(state.borrow().commands.contains(&"listfiles RADIO".to_string()));
    }

    #[test]
    fn test_load_without_station_directory() {
        let mut library = FakeState::library();
        library.root.clear();
        let (mut session, state) = fake_session(library);
        let catalogs = loader().load(&mut session).unwrap();
        assert_eq!(catalogs.songs.len(), 5);
        assert!(catalogs.stations.is_empty());
        assert!(!state.borrow().commands.contains(&"listfiles RADIO".to_string()));
    }

    #[test]
    fn test_load_fails_when_daemon_unreachable() {
        let mut library = FakeState::library();
        library.unreachable = Some(jukebox_proto::mpd::FailureKind::ConnectionRefused);
        let (mut session, _state) = fake_session(library);
        assert!(loader().load(&mut session).is_err());
    }

    #[test]
    fn test_collect_catalog() {
        let catalog: MediaCatalog = [("002", "b"), ("001", "a")].into_iter().collect();
        let codes: Vec<&str> = catalog.iter().map(|(code, _)| code).collect();
        assert_eq!(codes, vec!["001", "002"]);
        assert_eq!(catalog.references().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
