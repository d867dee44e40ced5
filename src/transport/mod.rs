pub mod connector;
pub mod manager;

pub use connector::{Connector, Link, LinkPeer, WebSocketConnector};
pub use manager::{
    ConnectionState, TransportConfig, TransportCounters, TransportHandle, TransportManager,
    TransportStats,
};
