// Integration tests for the frame codec
//
// These tests verify that frames survive the wire format and that bad input
// is rejected as malformed instead of being misread.

use anyhow::Result;
use proptest::prelude::*;
use prost::Message;
use voice_chat_client::frames::pcm;
use voice_chat_client::frames::wire::{self, frame::Frame as Payload};
use voice_chat_client::frames::{
    AudioPayload, Frame, FrameCodec, MessagePayload, TextPayload, TranscriptionPayload,
};
use voice_chat_client::FrameError;

fn codec() -> FrameCodec {
    FrameCodec::embedded().expect("embedded schema should verify")
}

#[test]
fn test_round_trip_every_frame_kind() -> Result<()> {
    let codec = codec();

    let frames = vec![
        Frame::Audio(AudioPayload {
            audio: pcm::samples_to_pcm16_le(&[0.0, 0.25, -0.25, 1.0]),
            sample_rate: 16000,
            num_channels: 1,
        }),
        Frame::Text(TextPayload {
            text: "Tell me about yourself.".to_string(),
        }),
        Frame::Transcription(TranscriptionPayload {
            text: "I build audio software".to_string(),
            user_id: "user-1".to_string(),
            timestamp: "2025-01-01T10:00:00Z".to_string(),
        }),
        Frame::Message(MessagePayload {
            data: r#"{"label":"rtvi-ai","type":"bot-ready"}"#.to_string(),
        }),
    ];

    for frame in frames {
        let bytes = codec.encode(&frame)?;
        let decoded = codec.decode(&bytes)?;
        assert_eq!(decoded, frame, "{} frame should survive the wire", frame.kind());
    }

    Ok(())
}

fn any_frame() -> impl Strategy<Value = Frame> {
    prop_oneof![
        (
            proptest::collection::vec(any::<u8>(), 0..2048),
            1u32..=192_000,
            1u32..=8,
        )
            .prop_map(|(audio, sample_rate, num_channels)| {
                Frame::Audio(AudioPayload {
                    audio,
                    sample_rate,
                    num_channels,
                })
            }),
        any::<String>().prop_map(|text| Frame::Text(TextPayload { text })),
        (any::<String>(), any::<String>(), any::<String>()).prop_map(
            |(text, user_id, timestamp)| {
                Frame::Transcription(TranscriptionPayload {
                    text,
                    user_id,
                    timestamp,
                })
            }
        ),
        any::<String>().prop_map(|data| Frame::Message(MessagePayload { data })),
    ]
}

proptest! {
    #[test]
    fn test_every_valid_frame_survives_the_wire(frame in any_frame()) {
        let codec = codec();
        let bytes = codec.encode(&frame).unwrap();

        prop_assert_eq!(codec.decode(&bytes).unwrap(), frame);
    }
}

#[test]
fn test_unicode_text_round_trip() -> Result<()> {
    let codec = codec();
    let frame = Frame::Text(TextPayload {
        text: "Grüße, 你好 👋".to_string(),
    });

    let decoded = codec.decode(&codec.encode(&frame)?)?;
    assert_eq!(decoded, frame);

    Ok(())
}

#[test]
fn test_empty_audio_is_still_a_valid_frame() -> Result<()> {
    let codec = codec();
    let frame = Frame::Audio(AudioPayload {
        audio: Vec::new(),
        sample_rate: 16000,
        num_channels: 1,
    });

    let decoded = codec.decode(&codec.encode(&frame)?)?;
    assert_eq!(decoded, frame);

    Ok(())
}

#[test]
fn test_encode_rejects_frame_without_payload() {
    let codec = codec();
    let result = codec.encode_wire(&wire::Frame { frame: None });

    assert_eq!(result, Err(FrameError::MissingPayload));
}

#[test]
fn test_encode_rejects_zero_sample_rate() {
    let codec = codec();
    let frame = Frame::Audio(AudioPayload {
        audio: vec![0, 0],
        sample_rate: 0,
        num_channels: 1,
    });

    assert!(matches!(codec.encode(&frame), Err(FrameError::InvalidAudio(_))));
}

#[test]
fn test_encode_rejects_zero_channels() {
    let codec = codec();
    let frame = Frame::Audio(AudioPayload {
        audio: vec![0, 0],
        sample_rate: 16000,
        num_channels: 0,
    });

    assert!(matches!(codec.encode(&frame), Err(FrameError::InvalidAudio(_))));
}

#[test]
fn test_decode_empty_message_is_malformed() {
    // A zero-length message is a Frame with no payload set
    let result = codec().decode(&[]);

    assert!(matches!(result, Err(FrameError::Malformed(_))));
}

#[test]
fn test_decode_truncated_bytes_is_malformed() -> Result<()> {
    let codec = codec();
    let bytes = codec.encode(&Frame::Text(TextPayload {
        text: "this will be cut short".to_string(),
    }))?;

    let result = codec.decode(&bytes[..bytes.len() - 5]);
    assert!(matches!(result, Err(FrameError::Malformed(_))));

    Ok(())
}

#[test]
fn test_decode_garbage_is_malformed() {
    let result = codec().decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);

    assert!(matches!(result, Err(FrameError::Malformed(_))));
}

#[test]
fn test_decode_type_mismatch_is_malformed() {
    // Field 1 (text) sent as a varint instead of a length-delimited message
    let result = codec().decode(&[0x08, 0x01]);

    assert!(matches!(result, Err(FrameError::Malformed(_))));
}

#[test]
fn test_decode_audio_with_zero_rate_is_malformed() {
    let raw = wire::Frame {
        frame: Some(Payload::Audio(wire::AudioRawFrame {
            audio: vec![1, 2, 3, 4],
            sample_rate: 0,
            num_channels: 1,
            ..Default::default()
        })),
    };

    let result = codec().decode(&raw.encode_to_vec());
    assert!(matches!(result, Err(FrameError::Malformed(_))));
}

#[test]
fn test_decode_ignores_unused_fields() -> Result<()> {
    // The backend fills id/name/pts; they are not part of the payload
    let raw = wire::Frame {
        frame: Some(Payload::Audio(wire::AudioRawFrame {
            id: 42,
            name: "TTSAudioRawFrame#3".to_string(),
            audio: vec![9, 8, 7, 6],
            sample_rate: 24000,
            num_channels: 1,
            pts: Some(1_000_000),
        })),
    };

    let decoded = codec().decode(&raw.encode_to_vec())?;
    assert_eq!(
        decoded,
        Frame::Audio(AudioPayload {
            audio: vec![9, 8, 7, 6],
            sample_rate: 24000,
            num_channels: 1,
        })
    );

    Ok(())
}

#[test]
fn test_pcm_conversion_endpoints() {
    assert_eq!(pcm::sample_to_pcm16(1.0), 32767);
    assert_eq!(pcm::sample_to_pcm16(-1.0), -32768);
    assert_eq!(pcm::sample_to_pcm16(0.0), 0);
    assert_eq!(pcm::sample_to_pcm16(1.5), 32767, "Out of range input should clamp");
    assert_eq!(pcm::sample_to_pcm16(-3.0), -32768, "Out of range input should clamp");
}

#[test]
fn test_pcm_bytes_are_little_endian() {
    let bytes = pcm::samples_to_pcm16_le(&[1.0, -1.0]);

    assert_eq!(bytes, vec![0xFF, 0x7F, 0x00, 0x80]);
    assert_eq!(pcm::pcm16_le_to_samples(&bytes), vec![32767, -32768]);
}
