use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::TransportError;

/// A live duplex connection, seen from the transport manager
///
/// Dropping `outbound` closes the connection; `inbound` yielding `None`
/// means the connection closed or failed.
pub struct Link {
    pub outbound: mpsc::Sender<Vec<u8>>,
    pub inbound: mpsc::Receiver<Vec<u8>>,
}

/// The socket side of a `Link`
pub struct LinkPeer {
    pub outbound: mpsc::Receiver<Vec<u8>>,
    pub inbound: mpsc::Sender<Vec<u8>>,
}

impl Link {
    /// Create a connected `Link`/`LinkPeer` pair
    pub fn pair(capacity: usize) -> (Link, LinkPeer) {
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let (in_tx, in_rx) = mpsc::channel(capacity);
        (
            Link {
                outbound: out_tx,
                inbound: in_rx,
            },
            LinkPeer {
                outbound: out_rx,
                inbound: in_tx,
            },
        )
    }
}

/// Opens duplex, message-oriented connections to the backend
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Link, TransportError>;
}

/// Binary websocket connector
pub struct WebSocketConnector {
    capacity: usize,
}

impl WebSocketConnector {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Link, TransportError> {
        debug!("Opening websocket to {}", url);

        let (mut ws, _response) =
            tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| TransportError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        let (link, mut peer) = Link::pair(self.capacity);
        let url = url.to_string();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outgoing = peer.outbound.recv() => match outgoing {
                        Some(bytes) => {
                            if let Err(e) = ws.send(Message::Binary(bytes)).await {
                                warn!("Websocket send failed: {}", e);
                                break;
                            }
                        }
                        None => {
                            let _ = ws.close(None).await;
                            break;
                        }
                    },
                    incoming = ws.next() => match incoming {
                        Some(Ok(Message::Binary(data))) => {
                            if peer.inbound.send(data).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Text(text))) => {
                            debug!("Ignoring text websocket message ({} bytes)", text.len());
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!("Websocket closed by server: {:?}", frame);
                            break;
                        }
                        // Ping/pong are answered by tungstenite
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Websocket error: {}", e);
                            break;
                        }
                        None => break,
                    },
                }
            }
            debug!("Websocket to {} finished", url);
        });

        Ok(link)
    }
}
