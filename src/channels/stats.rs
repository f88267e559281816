//! Channel statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by a channel sender
#[derive(Debug, Default)]
pub struct ChannelStats {
    /// Messages accepted by the transport
    pub messages_sent: AtomicU64,
    /// Bytes accepted by the transport, frame headers included
    pub bytes_sent: AtomicU64,
    /// Sends rejected by the transport
    pub send_failures: AtomicU64,
}

impl ChannelStats {
    pub fn record_sent(&self, frame_size: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(frame_size as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ChannelStatsSnapshot {
        ChannelStatsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ChannelStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStatsSnapshot {
    pub messages_sent: u64,
    pub bytes_sent: u64,
    pub send_failures: u64,
}
