//! Transport contract consumed by channel senders

use crate::error::Result;

/// A one-directional, FIFO delivery path to the agent.
///
/// Implementations own framing on the wire, synchronization and wakeups.
/// `send` is synchronous: it either hands the frame to the transport or
/// returns the transport's failure.
pub trait MessageChannel: Send + Sync {
    fn send(&self, frame: &[u8]) -> Result<()>;
}

impl<C: MessageChannel + ?Sized> MessageChannel for std::sync::Arc<C> {
    fn send(&self, frame: &[u8]) -> Result<()> {
        (**self).send(frame)
    }
}
