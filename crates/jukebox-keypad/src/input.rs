//! Where keystrokes come from: an interactive terminal in raw mode, or any
//! byte stream (a keypad device piped into stdin).

use std::io::{self, Bytes, Read};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use jukebox_keypad::keys::BACKSPACE;
use tracing::debug;

const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;

pub trait KeySource {
    /// Block for the next key. `None` ends the session.
    fn next_key(&mut self) -> io::Result<Option<char>>;
}

/// Raw-mode terminal input. Raw mode lasts as long as the value does.
pub struct TerminalKeys {
    _private: (),
}

impl TerminalKeys {
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        debug!("raw mode enabled");
        Ok(Self { _private: () })
    }
}

impl Drop for TerminalKeys {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

impl KeySource for TerminalKeys {
    fn next_key(&mut self) -> io::Result<Option<char>> {
        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind == KeyEventKind::Release {
                continue;
            }
            if key.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'))
            {
                return Ok(None);
            }
            let ch = match key.code {
                KeyCode::Char(c) => c,
                KeyCode::Enter => '\n',
                KeyCode::Backspace | KeyCode::Delete => BACKSPACE,
                _ => continue,
            };
            return Ok(Some(ch));
        }
    }
}

/// One byte per key, for input that is not a terminal.
pub struct StreamKeys<R: Read> {
    bytes: Bytes<R>,
}

impl<R: Read> StreamKeys<R> {
    pub fn new(reader: R) -> Self {
        Self {
            bytes: reader.bytes(),
        }
    }
}

impl<R: Read> KeySource for StreamKeys<R> {
    fn next_key(&mut self) -> io::Result<Option<char>> {
        match self.bytes.next().transpose()? {
            None | Some(CTRL_C) | Some(CTRL_D) => Ok(None),
            Some(byte) => Ok(Some(char::from(byte))),
        }
    }
}
