pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod frames;
pub mod playback;
pub mod session;
pub mod transport;

pub use audio::{
    AudioBlock, AudioFile, AudioSource, CaptureBackend, CaptureBackendFactory, CaptureConfig,
};
pub use capture::{CapturePipeline, CaptureState};
pub use config::Config;
pub use error::{AudioDecodeError, DeviceAccessError, FrameError, SchemaLoadError, TransportError};
pub use frames::{Frame, FrameCodec, Schema};
pub use playback::{AudioOutput, CpalOutput, NullOutput, PlaybackEvent, PlaybackPipeline};
pub use session::{
    SessionCommand, SessionComponents, SessionConfig, SessionController, SessionSnapshot,
    SessionStats,
};
pub use transport::{ConnectionState, Connector, TransportManager, WebSocketConnector};
