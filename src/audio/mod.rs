pub mod backend;
pub mod block;
pub mod file;
pub mod microphone;

pub use backend::{AudioBlock, AudioSource, CaptureBackend, CaptureBackendFactory, CaptureConfig};
pub use block::{BlockShaper, LinearResampler};
pub use file::{AudioFile, FileBackend};
pub use microphone::MicrophoneBackend;
