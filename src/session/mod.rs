//! Voice chat session management
//!
//! This module provides the `SessionController` that ties together:
//! - Frame schema verification and the codec
//! - The transport to the backend, with reconnects
//! - Microphone capture, gated on the connection
//! - Playback of the AI's audio replies
//! - The transcript and the derived status line

mod config;
mod controller;
mod state;
mod stats;

pub use config::SessionConfig;
pub use controller::{SessionCommand, SessionComponents, SessionController};
pub use state::{
    status_message, Notice, PlaybackState, Sender, SessionSnapshot, TranscriptEntry,
};
pub use stats::SessionStats;
