// Capture pipeline: microphone blocks -> PCM -> audio frames -> transport
//
// Blocks captured while the transport is not connected are dropped (and
// counted) by the transport handle. Nothing is buffered for later.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::{AudioBlock, CaptureBackend};
use crate::error::DeviceAccessError;
use crate::frames::{pcm, AudioPayload, Frame, FrameCodec};
use crate::transport::TransportHandle;

/// Whether the microphone is being captured and streamed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Capturing,
}

/// What happened to one captured block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    Sent,
    Dropped,
}

/// Owns the capture backend and forwards its blocks to the transport
pub struct CapturePipeline {
    backend: Box<dyn CaptureBackend>,
    codec: FrameCodec,
    transport: TransportHandle,
    sample_rate: u32,
    num_channels: u32,
    forwarder: Option<JoinHandle<()>>,
    /// Cleared by the forwarder when the input stream ends on its own
    streaming: Arc<AtomicBool>,
    input_ended: Option<mpsc::Sender<()>>,
}

impl CapturePipeline {
    pub fn new(
        backend: Box<dyn CaptureBackend>,
        codec: FrameCodec,
        transport: TransportHandle,
        sample_rate: u32,
        num_channels: u32,
    ) -> Self {
        Self {
            backend,
            codec,
            transport,
            sample_rate,
            num_channels,
            forwarder: None,
            streaming: Arc::new(AtomicBool::new(false)),
            input_ended: None,
        }
    }

    /// Signal `tx` whenever the input stream ends without `stop`
    /// (end of a file, or a device that went away)
    pub fn with_end_notifier(mut self, tx: mpsc::Sender<()>) -> Self {
        self.input_ended = Some(tx);
        self
    }

    pub fn state(&self) -> CaptureState {
        if self.forwarder.is_some() && self.streaming.load(Ordering::SeqCst) {
            CaptureState::Capturing
        } else {
            CaptureState::Idle
        }
    }

    /// Acquire the input and start streaming blocks
    ///
    /// On failure the pipeline stays `Idle` and the caller may retry.
    pub async fn start(&mut self) -> Result<(), DeviceAccessError> {
        if self.state() == CaptureState::Capturing {
            debug!("Capture already running");
            return Ok(());
        }

        // A previous run whose input ended still holds the backend
        if self.forwarder.is_some() {
            self.stop().await;
        }

        info!("Starting capture via {}", self.backend.name());
        let blocks = self.backend.start().await?;

        let codec = self.codec.clone();
        let transport = self.transport.clone();
        let (sample_rate, num_channels) = (self.sample_rate, self.num_channels);
        let streaming = Arc::new(AtomicBool::new(true));
        let ended = self.input_ended.clone();

        self.streaming = streaming.clone();
        self.forwarder = Some(tokio::spawn(async move {
            forward_blocks(blocks, codec, transport, sample_rate, num_channels).await;

            streaming.store(false, Ordering::SeqCst);
            if let Some(ended) = ended {
                let _ = ended.try_send(());
            }
        }));

        Ok(())
    }

    /// Stop streaming and release the input. Safe to call when idle.
    pub async fn stop(&mut self) {
        let was_running = self.forwarder.is_some() || self.backend.is_capturing();

        // The forwarder goes first so closing the input does not look like
        // the stream ending on its own
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
            let _ = forwarder.await;
        }
        self.streaming.store(false, Ordering::SeqCst);

        if let Err(e) = self.backend.stop().await {
            warn!("Failed to stop {}: {}", self.backend.name(), e);
        }

        if was_running {
            info!("Capture stopped");
        }
    }
}

async fn forward_blocks(
    mut blocks: mpsc::Receiver<AudioBlock>,
    codec: FrameCodec,
    transport: TransportHandle,
    sample_rate: u32,
    num_channels: u32,
) {
    let mut sent = 0u64;
    let mut dropped = 0u64;

    while let Some(block) = blocks.recv().await {
        match forward_block(&block, &codec, &transport, sample_rate, num_channels) {
            BlockOutcome::Sent => sent += 1,
            BlockOutcome::Dropped => dropped += 1,
        }
    }

    debug!(
        "Capture input ended ({} blocks sent, {} dropped)",
        sent, dropped
    );
}

/// Encode one captured block and hand it to the transport
pub fn forward_block(
    block: &AudioBlock,
    codec: &FrameCodec,
    transport: &TransportHandle,
    sample_rate: u32,
    num_channels: u32,
) -> BlockOutcome {
    let frame = Frame::Audio(AudioPayload {
        audio: pcm::samples_to_pcm16_le(&block.samples),
        sample_rate,
        num_channels,
    });

    match codec.encode(&frame) {
        Ok(bytes) => {
            if transport.send(bytes) {
                BlockOutcome::Sent
            } else {
                BlockOutcome::Dropped
            }
        }
        Err(e) => {
            warn!("Failed to encode audio block: {}", e);
            BlockOutcome::Dropped
        }
    }
}
