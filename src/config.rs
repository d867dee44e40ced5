use anyhow::{bail, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub transport: TransportSettings,
    pub audio: AudioConfig,
    pub schema: SchemaConfig,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub url: String,
    pub reconnect_delay_ms: u64,
    pub max_reconnect_attempts: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub block_size: usize,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    pub playback: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Path to frames.proto; the embedded copy is used when unset
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub greeting: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "voice-chat-client".to_string(),
        }
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8765".to_string(),
            reconnect_delay_ms: 3000,
            max_reconnect_attempts: None,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            block_size: 512,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            playback: true,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            greeting: Some("Hello! I'm your AI interviewer. Shall we begin?".to_string()),
        }
    }
}

impl Config {
    /// Load `path` (any format the config crate knows, extension optional)
    /// layered under `VOICE_CHAT__SECTION__KEY` environment variables.
    /// A missing file is not an error.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("VOICE_CHAT").separator("__"))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        // Captured audio is always down-mixed before it is sent
        if self.audio.channels != 1 {
            bail!(
                "audio.channels must be 1 (mono), got {}",
                self.audio.channels
            );
        }
        if self.audio.sample_rate == 0 || self.audio.block_size == 0 {
            bail!("audio.sample_rate and audio.block_size must be positive");
        }
        Ok(())
    }
}
