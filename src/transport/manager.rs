use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::connector::{Connector, Link};
use crate::frames::{Frame, FrameCodec};

/// Connection lifecycle as seen by the rest of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Backend websocket URL
    pub url: String,
    /// Fixed delay before every reconnect attempt
    pub reconnect_delay: Duration,
    /// Consecutive failed attempts tolerated before giving up (None = retry forever)
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8765".to_string(),
            reconnect_delay: Duration::from_millis(3000),
            max_reconnect_attempts: None,
        }
    }
}

/// Frame counters, shared between the transport and its handles
#[derive(Debug, Default)]
pub struct TransportStats {
    pub frames_sent: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub frames_received: AtomicU64,
    pub malformed_frames: AtomicU64,
    pub connect_attempts: AtomicU64,
}

/// Point-in-time copy of `TransportStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransportCounters {
    pub frames_sent: u64,
    pub frames_dropped: u64,
    pub frames_received: u64,
    pub malformed_frames: u64,
    pub connect_attempts: u64,
}

impl TransportStats {
    pub fn counters(&self) -> TransportCounters {
        TransportCounters {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
        }
    }
}

type LinkSlot = Arc<Mutex<Option<mpsc::Sender<Vec<u8>>>>>;

fn lock_slot(slot: &LinkSlot) -> MutexGuard<'_, Option<mpsc::Sender<Vec<u8>>>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn set_state(state_tx: &watch::Sender<ConnectionState>, next: ConnectionState) {
    state_tx.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            debug!("Connection state: {:?} -> {:?}", current, next);
            *current = next;
            true
        }
    });
}

/// Cheap, cloneable sending side of the transport
#[derive(Clone)]
pub struct TransportHandle {
    state: watch::Receiver<ConnectionState>,
    link: LinkSlot,
    stats: Arc<TransportStats>,
}

impl TransportHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Hand one encoded frame to the socket
    ///
    /// Returns false (and drops the bytes) unless the transport is connected
    /// and the socket writer has room. Never blocks.
    pub fn send(&self, bytes: Vec<u8>) -> bool {
        if !self.is_connected() {
            self.stats.frames_dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let slot = lock_slot(&self.link);
        let Some(outbound) = slot.as_ref() else {
            self.stats.frames_dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        match outbound.try_send(bytes) {
            Ok(()) => {
                self.stats.frames_sent.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("Socket writer is behind, dropping outgoing frame");
                self.stats.frames_dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.frames_dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

/// Owns the backend connection: connect, receive-dispatch, reconnect, teardown
pub struct TransportManager {
    config: TransportConfig,
    codec: FrameCodec,
    connector: Arc<dyn Connector>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    state_rx: watch::Receiver<ConnectionState>,
    link: LinkSlot,
    stats: Arc<TransportStats>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    torn_down: bool,
}

impl TransportManager {
    pub fn new(config: TransportConfig, codec: FrameCodec, connector: Arc<dyn Connector>) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            codec,
            connector,
            state_tx: Arc::new(state_tx),
            state_rx,
            link: Arc::new(Mutex::new(None)),
            stats: Arc::new(TransportStats::default()),
            shutdown_tx,
            task: None,
            torn_down: false,
        }
    }

    /// Start connecting; decoded inbound frames are delivered to `frames_tx`
    ///
    /// Retries run in the background until `teardown()`.
    pub fn connect(&mut self, frames_tx: mpsc::Sender<Frame>) {
        if self.torn_down {
            warn!("Transport already torn down, not connecting");
            return;
        }
        if self.task.is_some() {
            debug!("Transport already running");
            return;
        }

        let supervisor = Supervisor {
            config: self.config.clone(),
            codec: self.codec.clone(),
            connector: Arc::clone(&self.connector),
            state_tx: Arc::clone(&self.state_tx),
            link: Arc::clone(&self.link),
            stats: Arc::clone(&self.stats),
            shutdown_rx: self.shutdown_tx.subscribe(),
            frames_tx,
        };

        self.task = Some(tokio::spawn(supervisor.run()));
    }

    pub fn handle(&self) -> TransportHandle {
        TransportHandle {
            state: self.state_rx.clone(),
            link: Arc::clone(&self.link),
            stats: Arc::clone(&self.stats),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn stats(&self) -> Arc<TransportStats> {
        Arc::clone(&self.stats)
    }

    /// Close the socket, cancel any pending reconnect, and go `Disconnected`
    ///
    /// Terminal for this manager. Calling it again is a no-op.
    pub async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        info!("Tearing down transport");
        self.shutdown_tx.send_replace(true);

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Transport task failed: {}", e);
            }
        }

        lock_slot(&self.link).take();
        set_state(&self.state_tx, ConnectionState::Disconnected);
    }
}

enum LinkEnd {
    Closed,
    Shutdown,
}

struct Supervisor {
    config: TransportConfig,
    codec: FrameCodec,
    connector: Arc<dyn Connector>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    link: LinkSlot,
    stats: Arc<TransportStats>,
    shutdown_rx: watch::Receiver<bool>,
    frames_tx: mpsc::Sender<Frame>,
}

impl Supervisor {
    async fn run(mut self) {
        let mut failures: u32 = 0;

        loop {
            set_state(&self.state_tx, ConnectionState::Connecting);
            self.stats.connect_attempts.fetch_add(1, Ordering::Relaxed);
            info!("Connecting to {}", self.config.url);

            let attempt = tokio::select! {
                _ = self.shutdown_rx.changed() => break,
                result = self.connector.connect(&self.config.url) => result,
            };

            match attempt {
                Ok(link) => {
                    failures = 0;
                    info!("Connected to {}", self.config.url);
                    if let LinkEnd::Shutdown = self.pump(link).await {
                        break;
                    }
                    warn!("Connection to {} closed", self.config.url);
                }
                Err(e) => warn!("{}", e),
            }

            failures += 1;
            if let Some(max) = self.config.max_reconnect_attempts {
                if failures > max {
                    error!("Giving up after {} failed reconnect attempts", max);
                    break;
                }
            }

            set_state(&self.state_tx, ConnectionState::Reconnecting);
            info!("Reconnecting in {:?}", self.config.reconnect_delay);

            tokio::select! {
                _ = self.shutdown_rx.changed() => break,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }

        lock_slot(&self.link).take();
        set_state(&self.state_tx, ConnectionState::Disconnected);
    }

    async fn pump(&mut self, link: Link) -> LinkEnd {
        let Link {
            outbound,
            mut inbound,
        } = link;

        *lock_slot(&self.link) = Some(outbound);
        set_state(&self.state_tx, ConnectionState::Connected);

        let end = loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => break LinkEnd::Shutdown,
                message = inbound.recv() => {
                    let Some(bytes) = message else {
                        break LinkEnd::Closed;
                    };
                    let Some(frame) = self.decode(&bytes) else {
                        continue;
                    };
                    tokio::select! {
                        _ = self.shutdown_rx.changed() => break LinkEnd::Shutdown,
                        sent = self.frames_tx.send(frame) => {
                            if sent.is_err() {
                                debug!("Frame receiver gone, discarding inbound frame");
                            }
                        }
                    }
                }
            }
        };

        // Dropping the sender closes the socket
        lock_slot(&self.link).take();
        end
    }

    fn decode(&self, bytes: &[u8]) -> Option<Frame> {
        self.stats.frames_received.fetch_add(1, Ordering::Relaxed);

        match self.codec.decode(bytes) {
            Ok(frame) => {
                debug!("Received {} frame ({} bytes)", frame.kind(), bytes.len());
                Some(frame)
            }
            Err(e) => {
                self.stats.malformed_frames.fetch_add(1, Ordering::Relaxed);
                warn!("Dropping inbound frame ({} bytes): {}", bytes.len(), e);
                None
            }
        }
    }
}
