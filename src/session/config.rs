use std::path::PathBuf;
use std::time::Duration;

use crate::audio::CaptureConfig;
use crate::config::Config;
use crate::transport::TransportConfig;

/// Configuration for a voice chat session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "session-6f1c...")
    pub session_id: String,

    /// Backend connection and reconnect policy
    pub transport: TransportConfig,

    /// Capture format; the wire carries `sample_rate` Hz mono
    pub capture: CaptureConfig,

    /// frames.proto to verify against; None uses the embedded copy
    pub schema_path: Option<PathBuf>,

    /// First transcript line, spoken by the AI
    pub greeting: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            transport: TransportConfig {
                url: cfg.transport.url.clone(),
                reconnect_delay: Duration::from_millis(cfg.transport.reconnect_delay_ms),
                max_reconnect_attempts: cfg.transport.max_reconnect_attempts,
            },
            capture: CaptureConfig {
                sample_rate: cfg.audio.sample_rate,
                channels: cfg.audio.channels,
                block_size: cfg.audio.block_size,
                echo_cancellation: cfg.audio.echo_cancellation,
                noise_suppression: cfg.audio.noise_suppression,
                auto_gain_control: cfg.audio.auto_gain_control,
                ..CaptureConfig::default()
            },
            schema_path: cfg.schema.path.as_ref().map(PathBuf::from),
            greeting: cfg.session.greeting.clone(),
        }
    }
}
