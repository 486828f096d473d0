pub mod catalog;
pub mod jukebox;
pub mod keys;
pub mod mode;
pub mod session;

#[cfg(test)]
mod testing;

pub use jukebox::{ControllerState, Jukebox, KeyEffect};
