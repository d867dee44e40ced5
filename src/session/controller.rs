use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::state::{
    status_message, Notice, PlaybackState, SessionSnapshot, Sender, TranscriptEntry,
};
use super::stats::SessionStats;
use crate::audio::CaptureBackend;
use crate::capture::{CapturePipeline, CaptureState};
use crate::error::SchemaLoadError;
use crate::frames::{Frame, FrameCodec};
use crate::playback::{AudioOutput, PlaybackEvent, PlaybackPipeline};
use crate::transport::{ConnectionState, Connector, TransportCounters, TransportManager};

/// Capacity of the decoded-frame and playback-event channels
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// External resources a session drives
pub struct SessionComponents {
    pub connector: Arc<dyn Connector>,
    pub capture_backend: Box<dyn CaptureBackend>,
    pub audio_output: Arc<dyn AudioOutput>,
}

/// Requests from the UI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    ToggleCapture,
    Shutdown,
}

/// Frame schema, transport, capture and playback wired into one session
///
/// All session state is mutated from the task that owns the controller.
/// Components report back over channels that `run` multiplexes.
pub struct SessionController {
    config: SessionConfig,
    started_at: DateTime<Utc>,

    /// None when the schema failed to load
    transport: Option<TransportManager>,
    capture: Option<CapturePipeline>,
    playback: PlaybackPipeline,

    frames_tx: mpsc::Sender<Frame>,
    frames_rx: mpsc::Receiver<Frame>,
    playback_rx: mpsc::Receiver<PlaybackEvent>,
    connection_rx: watch::Receiver<ConnectionState>,
    capture_end_rx: mpsc::Receiver<()>,

    connection: ConnectionState,
    playback_state: PlaybackState,
    notice: Option<Notice>,
    transcript: Vec<TranscriptEntry>,

    snapshot_tx: watch::Sender<SessionSnapshot>,
    shut_down: bool,
}

impl SessionController {
    /// Create a session. A schema that fails to load leaves the session in
    /// a persistent error state with no transport.
    pub fn new(config: SessionConfig, components: SessionComponents) -> Self {
        info!("Creating voice chat session: {}", config.session_id);

        let SessionComponents {
            connector,
            capture_backend,
            audio_output,
        } = components;

        let (frames_tx, frames_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (playback_tx, playback_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let playback = PlaybackPipeline::new(audio_output, playback_tx);
        let (capture_end_tx, capture_end_rx) = mpsc::channel(1);

        let (transport, capture, connection_rx, notice) = match load_codec(&config) {
            Ok(codec) => {
                info!(
                    "Frame schema verified (package {}, from {})",
                    codec.schema().package(),
                    codec.schema().origin()
                );

                let transport =
                    TransportManager::new(config.transport.clone(), codec.clone(), connector);
                let capture = CapturePipeline::new(
                    capture_backend,
                    codec,
                    transport.handle(),
                    config.capture.sample_rate,
                    1,
                )
                .with_end_notifier(capture_end_tx);
                let connection_rx = transport.subscribe();

                (Some(transport), Some(capture), connection_rx, None)
            }
            Err(e) => {
                error!("Error loading frame schema: {}", e);
                let (_, connection_rx) = watch::channel(ConnectionState::Disconnected);
                (None, None, connection_rx, Some(Notice::SchemaError))
            }
        };

        let initial = SessionSnapshot {
            connection: ConnectionState::Disconnected,
            status: String::new(),
            transcript: Vec::new(),
            capturing: false,
            ai_speaking: false,
        };
        let (snapshot_tx, _) = watch::channel(initial);

        let mut controller = Self {
            config,
            started_at: Utc::now(),
            transport,
            capture,
            playback,
            frames_tx,
            frames_rx,
            playback_rx,
            connection_rx,
            capture_end_rx,
            connection: ConnectionState::Disconnected,
            playback_state: PlaybackState::Idle,
            notice,
            transcript: Vec::new(),
            snapshot_tx,
            shut_down: false,
        };

        if let Some(greeting) = controller.config.greeting.clone() {
            controller.append_transcript(greeting, Sender::Ai);
        }
        controller.publish();

        controller
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    /// Open the transport to the backend
    pub fn start(&mut self) {
        if self.shut_down {
            warn!("Session already shut down, not starting");
            return;
        }

        let Some(transport) = self.transport.as_mut() else {
            warn!("Frame schema unavailable, not connecting");
            return;
        };

        transport.connect(self.frames_tx.clone());
        self.connection = transport.state();
        self.publish();
    }

    /// Start capturing if idle, otherwise stop and wait for the reply
    pub async fn toggle_capture(&mut self) {
        if self.shut_down {
            return;
        }

        let Some(capture) = self.capture.as_mut() else {
            warn!("Frame schema unavailable, capture disabled");
            return;
        };

        match capture.state() {
            CaptureState::Idle => match capture.start().await {
                Ok(()) => {
                    info!("Capture started");
                    self.notice = None;
                }
                Err(e) => {
                    error!("Error accessing microphone: {}", e);
                    self.notice = Some(Notice::DeviceError);
                }
            },
            CaptureState::Capturing => {
                capture.stop().await;
                self.notice = Some(Notice::Processing);
            }
        }

        self.publish();
    }

    /// Route one decoded inbound frame
    pub fn handle_frame(&mut self, frame: Frame) {
        if self.shut_down {
            return;
        }

        match frame {
            Frame::Audio(payload) => {
                debug!(
                    "Queueing {} bytes of audio ({}Hz, {} channels)",
                    payload.audio.len(),
                    payload.sample_rate,
                    payload.num_channels
                );
                self.playback.play(payload);
            }
            Frame::Text(text) => {
                self.append_transcript(text.text, Sender::Ai);
                self.publish();
            }
            Frame::Transcription(transcription) => {
                if transcription.text.trim().is_empty() {
                    return;
                }
                self.append_transcript(transcription.text, Sender::User);
                self.publish();
            }
            Frame::Message(message) => {
                debug!("Backend message: {}", message.data);
            }
        }
    }

    pub fn handle_playback_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Started { active } => {
                debug!("Playback started ({} active)", active);
                self.playback_state = PlaybackState::Playing;
            }
            PlaybackEvent::Ended { remaining } => {
                debug!("Playback ended ({} remaining)", remaining);
                if remaining == 0 {
                    self.playback_state = PlaybackState::Idle;
                    if self.notice != Some(Notice::SchemaError) {
                        self.notice = Some(Notice::AwaitingTurn);
                    }
                }
            }
        }

        self.publish();
    }

    /// The capture input ran out without being stopped
    pub fn handle_capture_ended(&mut self) {
        if self.shut_down || self.capture_state() == CaptureState::Capturing {
            return;
        }
        info!("Capture input ended");
        self.notice = Some(Notice::Processing);
        self.publish();
    }

    pub fn handle_connection_change(&mut self, state: ConnectionState) {
        if self.connection == state {
            return;
        }
        info!("Connection {:?}", state);
        self.connection = state;
        self.publish();
    }

    /// Drive the session until a `Shutdown` command (or the command channel
    /// closing), then release every resource
    pub async fn run(&mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::ToggleCapture) => self.toggle_capture().await,
                    Some(SessionCommand::Shutdown) | None => break,
                },
                Some(frame) = self.frames_rx.recv() => self.handle_frame(frame),
                Some(event) = self.playback_rx.recv() => self.handle_playback_event(event),
                Some(()) = self.capture_end_rx.recv() => self.handle_capture_ended(),
                Ok(()) = self.connection_rx.changed() => {
                    let state = *self.connection_rx.borrow_and_update();
                    self.handle_connection_change(state);
                }
            }
        }

        self.shutdown().await;
    }

    /// Tear down transport, capture and playback
    ///
    /// Each is released unconditionally, whether or not it was started.
    /// Calling this again is a no-op.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        info!("Shutting down session: {}", self.config.session_id);

        if let Some(transport) = self.transport.as_mut() {
            transport.teardown().await;
        }
        if let Some(capture) = self.capture.as_mut() {
            capture.stop().await;
        }
        self.playback.close().await;

        self.shut_down = true;
        self.connection = ConnectionState::Disconnected;
        self.playback_state = PlaybackState::Idle;
        self.publish();

        let stats = self.stats();
        info!(
            "Session {} ended after {:.1}s ({} frames sent, {} received, {} transcript lines)",
            stats.session_id,
            stats.duration_secs,
            stats.transport.frames_sent,
            stats.transport.frames_received,
            stats.transcript_entries
        );
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture
            .as_ref()
            .map(CapturePipeline::state)
            .unwrap_or(CaptureState::Idle)
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback_state
    }

    pub fn notice(&self) -> Option<Notice> {
        self.notice
    }

    pub fn status(&self) -> &'static str {
        status_message(
            self.connection,
            self.capture_state(),
            self.playback_state,
            self.notice,
        )
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Watch snapshots as the session changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn stats(&self) -> SessionStats {
        let transport = self
            .transport
            .as_ref()
            .map(|t| t.stats().counters())
            .unwrap_or_else(TransportCounters::default);

        SessionStats {
            session_id: self.config.session_id.clone(),
            started_at: self.started_at,
            duration_secs: (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0,
            is_capturing: self.capture_state() == CaptureState::Capturing,
            transport,
            transcript_entries: self.transcript.len(),
        }
    }

    fn append_transcript(&mut self, text: String, sender: Sender) {
        let entry = TranscriptEntry {
            id: self.transcript.len() + 1,
            text,
            sender,
            received_at: Utc::now(),
        };
        match sender {
            Sender::Ai => info!("AI: {}", entry.text),
            Sender::User => info!("You: {}", entry.text),
        }
        self.transcript.push(entry);
    }

    fn publish(&self) {
        let snapshot = SessionSnapshot {
            connection: self.connection,
            status: self.status().to_string(),
            transcript: self.transcript.clone(),
            capturing: self.capture_state() == CaptureState::Capturing,
            ai_speaking: self.playback_state == PlaybackState::Playing,
        };

        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

fn load_codec(config: &SessionConfig) -> Result<FrameCodec, SchemaLoadError> {
    match &config.schema_path {
        Some(path) => FrameCodec::load(path),
        None => FrameCodec::embedded(),
    }
}
