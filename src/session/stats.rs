use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::transport::TransportCounters;

/// Statistics about a voice chat session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub session_id: String,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Whether the microphone is currently streaming
    pub is_capturing: bool,

    /// Frame counters from the transport
    pub transport: TransportCounters,

    /// Number of transcript lines, greeting included
    pub transcript_entries: usize,
}
