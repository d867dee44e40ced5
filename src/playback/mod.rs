//! Playback of received audio
//!
//! - `decoder`: format-sniffing decode of payload bytes (symphonia)
//! - `output`: `AudioOutput` sinks (cpal device, null)
//! - `pipeline`: ordered decode, overlapping playback, start/end events

pub mod decoder;
pub mod output;
pub mod pipeline;

pub use decoder::{decode_audio, DecodedAudio};
pub use output::{AudioOutput, CpalOutput, NullOutput};
pub use pipeline::{PlaybackEvent, PlaybackPipeline};
