use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::capture::CaptureState;
use crate::transport::ConnectionState;

/// Whether any received audio is currently sounding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Playing,
}

/// Who a transcript line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Ai,
}

/// A single line of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    /// 1-based position in the transcript
    pub id: usize,

    pub text: String,

    pub sender: Sender,

    /// When this line was appended
    pub received_at: DateTime<Utc>,
}

/// Transient or sticky conditions that shape the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    /// Capture just stopped; waiting for the backend's reply
    Processing,
    /// The AI finished speaking
    AwaitingTurn,
    /// The microphone could not be opened
    DeviceError,
    /// The frame schema failed to load. Never cleared.
    SchemaError,
}

/// Derive the status line from the session's state
///
/// Precedence, highest first: schema error, AI speaking, capturing,
/// device error, connection trouble, processing, awaiting turn, ready.
pub fn status_message(
    connection: ConnectionState,
    capture: CaptureState,
    playback: PlaybackState,
    notice: Option<Notice>,
) -> &'static str {
    if notice == Some(Notice::SchemaError) {
        return "Error loading protobuf";
    }
    if playback == PlaybackState::Playing {
        return "AI is speaking...";
    }
    if capture == CaptureState::Capturing {
        return "Recording...";
    }
    if notice == Some(Notice::DeviceError) {
        return "Error accessing microphone";
    }

    match connection {
        ConnectionState::Connecting => return "Connecting to server...",
        ConnectionState::Reconnecting => return "Connection closed",
        ConnectionState::Disconnected => return "Disconnected",
        ConnectionState::Connected => {}
    }

    match notice {
        Some(Notice::Processing) => "Processing...",
        Some(Notice::AwaitingTurn) => "Tap to speak",
        _ => "Ready to begin",
    }
}

/// Read-only view of the session for the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub connection: ConnectionState,
    pub status: String,
    pub transcript: Vec<TranscriptEntry>,
    pub capturing: bool,
    pub ai_speaking: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_beats_everything() {
        let status = status_message(
            ConnectionState::Connected,
            CaptureState::Capturing,
            PlaybackState::Playing,
            Some(Notice::SchemaError),
        );
        assert_eq!(status, "Error loading protobuf");
    }

    #[test]
    fn test_connection_trouble_hides_turn_notices() {
        let status = status_message(
            ConnectionState::Reconnecting,
            CaptureState::Idle,
            PlaybackState::Idle,
            Some(Notice::AwaitingTurn),
        );
        assert_eq!(status, "Connection closed");
    }
}
