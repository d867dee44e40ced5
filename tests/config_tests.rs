// Integration tests for configuration loading

use anyhow::Result;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use voice_chat_client::{Config, SessionConfig};

#[test]
fn test_missing_config_file_uses_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let cfg = Config::load(&dir.path().join("absent").display().to_string())?;

    assert_eq!(cfg.service.name, "voice-chat-client");
    assert_eq!(cfg.transport.url, "ws://localhost:8765");
    assert_eq!(cfg.transport.reconnect_delay_ms, 3000);
    assert_eq!(cfg.transport.max_reconnect_attempts, None);
    assert_eq!(cfg.audio.sample_rate, 16000);
    assert!(cfg.schema.path.is_none());

    Ok(())
}

#[test]
fn test_partial_config_file_keeps_other_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("voice-chat.toml");
    fs::write(
        &path,
        "[transport]\nurl = \"ws://interviewer.internal:9000\"\nmax_reconnect_attempts = 5\n\n\
         [schema]\npath = \"/etc/voice-chat/frames.proto\"\n\n[session]\ngreeting = \"Hi\"\n",
    )?;

    let cfg = Config::load(&path.display().to_string())?;

    assert_eq!(cfg.transport.url, "ws://interviewer.internal:9000");
    assert_eq!(cfg.transport.max_reconnect_attempts, Some(5));
    assert_eq!(cfg.transport.reconnect_delay_ms, 3000);
    assert_eq!(cfg.audio.block_size, 512);

    let session = SessionConfig::from(&cfg);
    assert_eq!(session.transport.url, "ws://interviewer.internal:9000");
    assert_eq!(session.transport.reconnect_delay, Duration::from_millis(3000));
    assert_eq!(session.transport.max_reconnect_attempts, Some(5));
    assert_eq!(
        session.schema_path.as_deref(),
        Some(std::path::Path::new("/etc/voice-chat/frames.proto"))
    );
    assert_eq!(session.greeting.as_deref(), Some("Hi"));

    Ok(())
}

#[test]
fn test_shipped_config_file_loads() -> Result<()> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/voice-chat");
    let cfg = Config::load(path)?;

    assert_eq!(cfg.transport.url, "ws://localhost:8765");
    assert!(cfg.audio.playback);

    Ok(())
}

#[test]
fn test_non_mono_capture_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("stereo.toml");
    fs::write(&path, "[audio]\nchannels = 2\n")?;

    let result = Config::load(&path.display().to_string());
    let err = result.expect_err("stereo capture must not load");
    assert!(err.to_string().contains("audio.channels"));

    Ok(())
}
