// Error types for each stage of the client pipeline
//
// Every error is handled at the boundary where it occurs. None of them
// tears down a session on its own: callers log, update the status line,
// or drop the offending frame.

use std::path::PathBuf;
use thiserror::Error;

/// Microphone / audio device could not be opened or used
#[derive(Debug, Error)]
pub enum DeviceAccessError {
    #[error("No input device available")]
    NoInputDevice,

    #[error("No output device available")]
    NoOutputDevice,

    #[error("Unsupported device configuration: {0}")]
    Unsupported(String),

    #[error("Audio stream error: {0}")]
    Stream(String),

    #[error("Audio input file error: {0}")]
    File(String),
}

/// A frame could not be encoded or decoded
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Outgoing frame has no payload variant set
    #[error("Frame has no payload set")]
    MissingPayload,

    /// Outgoing audio payload violates the schema constraints
    #[error("Invalid audio payload: {0}")]
    InvalidAudio(&'static str),

    /// Incoming bytes are truncated, mistyped, or carry no payload
    #[error("Malformed frame: {0}")]
    Malformed(String),
}

impl From<prost::DecodeError> for FrameError {
    fn from(e: prost::DecodeError) -> Self {
        FrameError::Malformed(e.to_string())
    }
}

/// The frame schema definition could not be loaded or does not match
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("Failed to read schema {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse schema: {0}")]
    Parse(String),

    #[error("Schema does not match compiled frame types: {0}")]
    Mismatch(String),
}

/// Transport open/send failures and unexpected closes
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Connection closed")]
    Closed,
}

/// Received audio payload could not be turned into a playable buffer
#[derive(Debug, Error)]
pub enum AudioDecodeError {
    #[error("Empty audio payload")]
    Empty,

    #[error("Unrecognised audio format: {0}")]
    Probe(String),

    #[error("No decodable audio track")]
    NoTrack,

    #[error("Audio decoder error: {0}")]
    Decoder(String),
}
