//! Frame codec
//!
//! Typed frames exchanged with the backend and their protobuf encoding:
//! - `Frame` / payload types used by the rest of the client
//! - `wire` types generated from `proto/frames.proto` at build time
//! - `Schema` verification of a shared .proto definition at startup
//! - float -> 16-bit PCM conversion for outgoing audio

mod codec;
pub mod pcm;
pub mod schema;
pub mod wire;

pub use codec::FrameCodec;
pub use schema::{Schema, EMBEDDED_SCHEMA};

/// Raw PCM (outgoing) or encoded audio (incoming) with its format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub audio: Vec<u8>,
    pub sample_rate: u32,
    pub num_channels: u32,
}

/// Text produced by the AI backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPayload {
    pub text: String,
}

/// Backend transcription of the user's speech
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionPayload {
    pub text: String,
    pub user_id: String,
    pub timestamp: String,
}

/// Opaque control message (usually JSON)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePayload {
    pub data: String,
}

/// One discrete message unit on the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Audio(AudioPayload),
    Text(TextPayload),
    Transcription(TranscriptionPayload),
    Message(MessagePayload),
}

impl Frame {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Audio(_) => "audio",
            Frame::Text(_) => "text",
            Frame::Transcription(_) => "transcription",
            Frame::Message(_) => "message",
        }
    }
}
