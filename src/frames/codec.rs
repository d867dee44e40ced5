use prost::Message;
use std::sync::Arc;

use super::schema::Schema;
use super::wire::{self, frame::Frame as Payload};
use super::{AudioPayload, Frame, MessagePayload, TextPayload, TranscriptionPayload};
use crate::error::{FrameError, SchemaLoadError};

/// Binary codec for `pipecat.Frame` messages
///
/// Holds the verified schema and nothing else, so encode/decode are pure and
/// the codec can be cloned freely into capture and transport tasks.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    schema: Arc<Schema>,
}

impl FrameCodec {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
        }
    }

    /// Codec backed by the embedded schema definition
    pub fn embedded() -> Result<Self, SchemaLoadError> {
        Ok(Self::new(Schema::embedded()?))
    }

    /// Codec backed by a .proto definition on disk
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, SchemaLoadError> {
        Ok(Self::new(Schema::load(path)?))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Encode a frame into wire bytes
    pub fn encode(&self, frame: &Frame) -> Result<Vec<u8>, FrameError> {
        self.encode_wire(&to_wire(frame))
    }

    /// Encode a raw schema message, rejecting one with no payload set
    pub fn encode_wire(&self, frame: &wire::Frame) -> Result<Vec<u8>, FrameError> {
        match &frame.frame {
            None => return Err(FrameError::MissingPayload),
            Some(Payload::Audio(audio)) => validate_audio(audio.sample_rate, audio.num_channels)?,
            Some(_) => {}
        }
        Ok(frame.encode_to_vec())
    }

    /// Decode wire bytes into a frame
    ///
    /// Truncated or mistyped input, a message with no payload, and audio
    /// with a zero sample rate or channel count are all `Malformed`.
    pub fn decode(&self, bytes: &[u8]) -> Result<Frame, FrameError> {
        let decoded = wire::Frame::decode(bytes)?;

        match decoded.frame {
            None => Err(FrameError::Malformed("no payload set".to_string())),
            Some(Payload::Audio(audio)) => {
                validate_audio(audio.sample_rate, audio.num_channels)
                    .map_err(|e| FrameError::Malformed(e.to_string()))?;
                Ok(Frame::Audio(AudioPayload {
                    audio: audio.audio,
                    sample_rate: audio.sample_rate,
                    num_channels: audio.num_channels,
                }))
            }
            Some(Payload::Text(text)) => Ok(Frame::Text(TextPayload { text: text.text })),
            Some(Payload::Transcription(t)) => Ok(Frame::Transcription(TranscriptionPayload {
                text: t.text,
                user_id: t.user_id,
                timestamp: t.timestamp,
            })),
            Some(Payload::Message(m)) => Ok(Frame::Message(MessagePayload { data: m.data })),
        }
    }
}

fn validate_audio(sample_rate: u32, num_channels: u32) -> Result<(), FrameError> {
    if sample_rate == 0 {
        return Err(FrameError::InvalidAudio("sample rate must be positive"));
    }
    if num_channels == 0 {
        return Err(FrameError::InvalidAudio("channel count must be positive"));
    }
    Ok(())
}

fn to_wire(frame: &Frame) -> wire::Frame {
    let payload = match frame {
        Frame::Audio(a) => Payload::Audio(wire::AudioRawFrame {
            audio: a.audio.clone(),
            sample_rate: a.sample_rate,
            num_channels: a.num_channels,
            ..Default::default()
        }),
        Frame::Text(t) => Payload::Text(wire::TextFrame {
            text: t.text.clone(),
            ..Default::default()
        }),
        Frame::Transcription(t) => Payload::Transcription(wire::TranscriptionFrame {
            text: t.text.clone(),
            user_id: t.user_id.clone(),
            timestamp: t.timestamp.clone(),
            ..Default::default()
        }),
        Frame::Message(m) => Payload::Message(wire::MessageFrame {
            data: m.data.clone(),
        }),
    };

    wire::Frame {
        frame: Some(payload),
    }
}
