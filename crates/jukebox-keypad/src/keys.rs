//! Keystroke → action translation.
//!
//! `on_key` only touches the pending digits; it never talks to the daemon.
//! The controller decides what an `Action` does.

use jukebox_proto::config::KeypadConfig;

/// DEL, what most terminals send for the backspace key.
pub const BACKSPACE: char = '\u{7f}';
const CTRL_H: char = '\u{8}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A digit was queued without completing anything.
    AppendDigit(char),
    Backspace,
    Reset,
    VolumeUp,
    VolumeDown,
    SkipTrack,
    Reconnect,
    /// A plain code of the full song width. The queue is already cleared.
    EnqueueCode(String),
    /// The digits after the station prefix, worth a lookup.
    EnqueueStation(StationAttempt),
    NoOp(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationAttempt {
    pub code: String,
    /// The gesture hit its length limit and the queue was cleared. Otherwise
    /// the digits stay pending until a lookup succeeds.
    pub exhausted: bool,
}

/// Widths and prefix that shape a gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeypadLayout {
    pub song_code_width: usize,
    pub station_prefix: char,
    pub station_code_max_width: usize,
}

impl KeypadLayout {
    pub fn from_config(config: &KeypadConfig) -> Self {
        Self {
            song_code_width: config.song_code_width,
            station_prefix: config.station_prefix,
            station_code_max_width: config.station_code_max_width,
        }
    }

    /// Longest a station gesture may grow before it is abandoned.
    pub fn station_gesture_limit(&self) -> usize {
        self.station_prefix.len_utf8() + self.station_code_max_width
    }
}

impl Default for KeypadLayout {
    fn default() -> Self {
        Self::from_config(&KeypadConfig::default())
    }
}

/// Digits typed so far in the current gesture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyQueue {
    digits: String,
}

impl KeyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn clear(&mut self) {
        self.digits.clear();
    }

    fn push(&mut self, digit: char) {
        self.digits.push(digit);
    }

    fn pop(&mut self) -> Option<char> {
        self.digits.pop()
    }

    fn take(&mut self) -> String {
        std::mem::take(&mut self.digits)
    }
}

pub fn on_key(queue: &mut KeyQueue, layout: &KeypadLayout, key: char) -> Action {
    match key {
        '0'..='9' => on_digit(queue, layout, key),
        BACKSPACE | CTRL_H => {
            queue.pop();
            Action::Backspace
        }
        'r' | '\n' | '\r' => {
            queue.clear();
            Action::Reset
        }
        '+' => Action::VolumeUp,
        '-' => Action::VolumeDown,
        's' | '/' => Action::SkipTrack,
        'i' | '*' => Action::Reconnect,
        other => Action::NoOp(other),
    }
}

fn on_digit(queue: &mut KeyQueue, layout: &KeypadLayout, digit: char) -> Action {
    queue.push(digit);

    if let Some(code) = queue.as_str().strip_prefix(layout.station_prefix) {
        if queue.len() <= layout.song_code_width {
            return Action::AppendDigit(digit);
        }
        let code = code.to_string();
        let exhausted = queue.len() >= layout.station_gesture_limit();
        if exhausted {
            queue.clear();
        }
        return Action::EnqueueStation(StationAttempt { code, exhausted });
    }

    if queue.len() >= layout.song_code_width {
        return Action::EnqueueCode(queue.take());
    }
    Action::AppendDigit(digit)
}
