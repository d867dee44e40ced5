use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::decoder::{decode_audio, DecodedAudio};
use super::output::AudioOutput;
use crate::error::AudioDecodeError;
use crate::frames::AudioPayload;

/// Playback transitions reported to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// A buffer started playing; `active` buffers are now sounding
    Started { active: usize },
    /// A buffer finished; `remaining` buffers are still sounding
    Ended { remaining: usize },
}

/// Decodes received audio and plays it as it arrives
///
/// Payloads are decoded strictly in receipt order, and each decoded buffer
/// starts immediately. Playback is not serialised, so buffers may overlap.
pub struct PlaybackPipeline {
    payloads: Option<mpsc::UnboundedSender<AudioPayload>>,
    scheduler: Option<JoinHandle<()>>,
    output: Arc<dyn AudioOutput>,
}

impl PlaybackPipeline {
    pub fn new(output: Arc<dyn AudioOutput>, events: mpsc::Sender<PlaybackEvent>) -> Self {
        let (payload_tx, payload_rx) = mpsc::unbounded_channel();

        info!("Playback pipeline using {} output", output.name());

        let scheduler = tokio::spawn(schedule(payload_rx, Arc::clone(&output), events));

        Self {
            payloads: Some(payload_tx),
            scheduler: Some(scheduler),
            output,
        }
    }

    /// Queue one payload for decode and playback. Never blocks.
    pub fn play(&self, payload: AudioPayload) {
        let Some(payloads) = &self.payloads else {
            debug!("Playback closed, discarding audio payload");
            return;
        };

        if payloads.send(payload).is_err() {
            warn!("Playback scheduler is gone, discarding audio payload");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.payloads.is_none()
    }

    /// Release the output context and cancel in-flight decode/playback
    ///
    /// Safe to call more than once.
    pub async fn close(&mut self) {
        if self.payloads.take().is_none() {
            return;
        }

        info!("Closing playback pipeline");
        self.output.close();

        if let Some(scheduler) = self.scheduler.take() {
            scheduler.abort();
            let _ = scheduler.await;
        }
    }
}

/// Starts and ends are counted and reported here, on the scheduler task,
/// so the session sees them in the order they happened.
async fn schedule(
    mut payloads: mpsc::UnboundedReceiver<AudioPayload>,
    output: Arc<dyn AudioOutput>,
    events: mpsc::Sender<PlaybackEvent>,
) {
    let mut active = 0usize;
    let mut playing = JoinSet::new();

    loop {
        tokio::select! {
            payload = payloads.recv() => {
                let Some(payload) = payload else {
                    break;
                };

                let buffer = match decode_payload(payload).await {
                    Ok(buffer) => buffer,
                    Err(e) => {
                        warn!("Audio decoding error: {}", e);
                        continue;
                    }
                };

                active += 1;
                let _ = events.send(PlaybackEvent::Started { active }).await;

                let output = Arc::clone(&output);
                playing.spawn(async move {
                    if let Err(e) = output.play(buffer).await {
                        error!("Playback failed: {}", e);
                    }
                });
            }
            Some(_) = playing.join_next(), if !playing.is_empty() => {
                active -= 1;
                let _ = events.send(PlaybackEvent::Ended { remaining: active }).await;
            }
        }
    }

    // Input closed: let buffers already sounding finish
    while playing.join_next().await.is_some() {
        active -= 1;
        let _ = events.send(PlaybackEvent::Ended { remaining: active }).await;
    }
}

async fn decode_payload(payload: AudioPayload) -> Result<DecodedAudio, AudioDecodeError> {
    let size = payload.audio.len();
    match tokio::task::spawn_blocking(move || decode_audio(payload.audio)).await {
        Ok(result) => result,
        Err(e) => {
            error!("Audio decode task failed for {} byte payload: {}", size, e);
            Err(AudioDecodeError::Decoder(e.to_string()))
        }
    }
}
