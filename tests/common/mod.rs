// Shared test doubles for the connector and capture backend
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use voice_chat_client::audio::{AudioBlock, CaptureBackend};
use voice_chat_client::transport::{Connector, Link, LinkPeer};
use voice_chat_client::{DeviceAccessError, TransportError};

/// Connector whose outcomes are scripted; succeeds once the script runs out
pub struct ScriptedConnector {
    failures: Mutex<VecDeque<bool>>,
    always_fail: bool,
    attempts: AtomicUsize,
    peers: mpsc::UnboundedSender<LinkPeer>,
}

impl ScriptedConnector {
    pub fn new(script: &[bool], always_fail: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<LinkPeer>) {
        let (peers, peer_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            failures: Mutex::new(script.iter().copied().collect()),
            always_fail,
            attempts: AtomicUsize::new(0),
            peers,
        });
        (connector, peer_rx)
    }

    /// Connector that always succeeds
    pub fn reliable() -> (Arc<Self>, mpsc::UnboundedReceiver<LinkPeer>) {
        Self::new(&[], false)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &str) -> Result<Link, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let fail = self.always_fail || self.failures.lock().unwrap().pop_front().unwrap_or(false);
        if fail {
            return Err(TransportError::Connect {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let (link, peer) = Link::pair(16);
        let _ = self.peers.send(peer);
        Ok(link)
    }
}

/// Capture backend that replays fixed blocks, or fails to open
pub struct ScriptedBackend {
    blocks: Vec<AudioBlock>,
    fail: bool,
    keep_open: bool,
    sender: Option<mpsc::Sender<AudioBlock>>,
    pub capturing: Arc<AtomicBool>,
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new(blocks: Vec<AudioBlock>) -> Self {
        Self {
            blocks,
            fail: false,
            keep_open: true,
            sender: None,
            capturing: Arc::new(AtomicBool::new(false)),
            starts: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Backend whose stream ends after the scripted blocks, like a file
    pub fn finite(blocks: Vec<AudioBlock>) -> Self {
        Self {
            keep_open: false,
            ..Self::new(blocks)
        }
    }

    /// Backend whose device can never be opened
    pub fn unavailable() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBlock>, DeviceAccessError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DeviceAccessError::NoInputDevice);
        }

        let (tx, rx) = mpsc::channel(self.blocks.len().max(1));
        for block in &self.blocks {
            tx.try_send(block.clone()).unwrap();
        }
        // Keep the stream open like a live microphone
        if self.keep_open {
            self.sender = Some(tx);
        }
        self.capturing.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), DeviceAccessError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.sender = None;
        self.capturing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A block of `len` samples holding `value`
pub fn block(value: f32, len: usize, timestamp_ms: u64) -> AudioBlock {
    AudioBlock {
        samples: vec![value; len],
        sample_rate: 16000,
        timestamp_ms,
    }
}
