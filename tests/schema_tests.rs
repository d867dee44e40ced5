// Integration tests for frame schema loading
//
// The .proto file shared with the backend is verified against the generated
// frame types; anything that would make the two disagree must fail to load.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use voice_chat_client::frames::{Schema, EMBEDDED_SCHEMA};
use voice_chat_client::{FrameCodec, SchemaLoadError};

fn write_schema(dir: &TempDir, text: &str) -> Result<PathBuf> {
    let path = dir.path().join("frames.proto");
    fs::write(&path, text)?;
    Ok(path)
}

fn load_text(text: &str) -> Result<Result<Schema, SchemaLoadError>> {
    let dir = TempDir::new()?;
    let path = write_schema(&dir, text)?;
    Ok(Schema::load(&path))
}

#[test]
fn test_embedded_schema_verifies() -> Result<()> {
    let schema = Schema::embedded()?;

    assert_eq!(schema.package(), "pipecat");
    assert_eq!(schema.origin(), "embedded");
    assert_eq!(schema.field("Frame", "audio").map(|f| f.tag), Some(2));
    assert_eq!(
        schema.field("AudioRawFrame", "sample_rate").map(|f| f.ty),
        Some("uint32".to_string())
    );

    Ok(())
}

#[test]
fn test_load_schema_from_disk() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_schema(&dir, EMBEDDED_SCHEMA)?;

    let codec = FrameCodec::load(&path)?;
    assert!(codec.schema().origin().ends_with("frames.proto"));
    assert_eq!(codec.schema().package(), "pipecat");

    Ok(())
}

#[test]
fn test_schema_with_extra_messages_and_comments_loads() -> Result<()> {
    let text = format!(
        "// Shared with the pipecat server\n{}\n/* not used by the client */\n\
         message Heartbeat {{ uint64 ts = 1; }}\nenum Kind {{ A = 0; B = 1; }}\n",
        EMBEDDED_SCHEMA
    );

    let schema = load_text(&text)??;
    assert!(schema.field("Heartbeat", "ts").is_some());

    Ok(())
}

#[test]
fn test_file_options_with_urls_load() -> Result<()> {
    let text = EMBEDDED_SCHEMA.replace(
        "package pipecat;",
        "package pipecat;\n\noption go_package = \"https://github.com/pipecat-ai/pipecat\";",
    );

    let schema = load_text(&text)??;
    assert_eq!(schema.field("MessageFrame", "data").map(|f| f.tag), Some(1));

    Ok(())
}

#[test]
fn test_map_and_nested_fields_load() -> Result<()> {
    let text = EMBEDDED_SCHEMA.replace(
        "message MessageFrame {\n  string data = 1;\n}",
        "message MessageFrame {\n  string data = 1;\n  map<string, string> meta = 2;\n\
         \x20 message Origin { string host = 1; }\n  Origin origin = 3;\n}",
    );

    let schema = load_text(&text)??;
    assert_eq!(schema.field("MessageFrame", "meta").map(|f| f.tag), Some(2));
    assert_eq!(
        schema.field("MessageFrame", "origin").map(|f| f.ty),
        Some("pipecat.MessageFrame.Origin".to_string())
    );
    assert!(
        schema.field("Origin", "host").is_none(),
        "Nested messages keep their qualified name"
    );

    Ok(())
}

#[test]
fn test_missing_schema_file_fails() {
    let result = Schema::load("/nonexistent/path/to/frames.proto");

    assert!(matches!(result, Err(SchemaLoadError::Io { .. })));
}

#[test]
fn test_wrong_tag_is_a_mismatch() -> Result<()> {
    let text = EMBEDDED_SCHEMA.replace("AudioRawFrame audio = 2;", "AudioRawFrame audio = 7;");

    assert!(
        matches!(load_text(&text)?, Err(SchemaLoadError::Mismatch(_))),
        "A renumbered oneof member must not load"
    );

    Ok(())
}

#[test]
fn test_wrong_type_is_a_mismatch() -> Result<()> {
    let text = EMBEDDED_SCHEMA.replace("uint32 sample_rate = 4;", "uint64 sample_rate = 4;");

    assert!(matches!(load_text(&text)?, Err(SchemaLoadError::Mismatch(_))));
    Ok(())
}

#[test]
fn test_member_moved_out_of_oneof_is_a_mismatch() -> Result<()> {
    let text = EMBEDDED_SCHEMA
        .replace("    MessageFrame message = 4;\n", "")
        .replace("message Frame {\n", "message Frame {\n  MessageFrame message = 4;\n");

    assert!(matches!(load_text(&text)?, Err(SchemaLoadError::Mismatch(_))));
    Ok(())
}

#[test]
fn test_missing_message_is_a_mismatch() -> Result<()> {
    let text = EMBEDDED_SCHEMA
        .replace("message MessageFrame {\n  string data = 1;\n}\n", "")
        .replace("    MessageFrame message = 4;\n", "");

    assert!(matches!(load_text(&text)?, Err(SchemaLoadError::Mismatch(_))));
    Ok(())
}

#[test]
fn test_wrong_package_is_a_mismatch() -> Result<()> {
    let text = EMBEDDED_SCHEMA.replace("package pipecat;", "package other;");

    assert!(matches!(load_text(&text)?, Err(SchemaLoadError::Mismatch(_))));
    Ok(())
}

#[test]
fn test_unbalanced_braces_fail_to_parse() -> Result<()> {
    let text = "syntax = \"proto3\";\npackage pipecat;\nmessage TextFrame { string text = 3;\n";

    assert!(matches!(load_text(text)?, Err(SchemaLoadError::Parse(_))));
    Ok(())
}

#[test]
fn test_invalid_tag_fails_to_parse() -> Result<()> {
    let text = EMBEDDED_SCHEMA.replace("string data = 1;", "string data = one;");

    assert!(matches!(load_text(&text)?, Err(SchemaLoadError::Parse(_))));
    Ok(())
}
