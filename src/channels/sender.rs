//! Routing of encoded messages onto the three logical channels

use std::{fmt, sync::Arc};

use log::{trace, warn};

use crate::{error::Result, messages::EncodedMessage};

use super::{
    stats::{ChannelStats, ChannelStatsSnapshot},
    traits::MessageChannel,
};

/// The logical channels between a component process and the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Region registration and other control requests
    Control,
    /// Feedback from the agent's decisions back into the component
    Feedback,
    /// Telemetry emitted by the component
    Telemetry,
}

impl ChannelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelKind::Control => "control",
            ChannelKind::Feedback => "feedback",
            ChannelKind::Telemetry => "telemetry",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hands fully encoded messages to one transport.
///
/// The sender neither buffers nor reorders; failures from the transport are
/// returned unchanged.
pub struct ChannelSender {
    kind: ChannelKind,
    channel: Arc<dyn MessageChannel>,
    stats: ChannelStats,
}

impl ChannelSender {
    pub fn new(kind: ChannelKind, channel: Arc<dyn MessageChannel>) -> Self {
        Self {
            kind,
            channel,
            stats: ChannelStats::default(),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Send one message
    pub fn send_message(&self, message: &EncodedMessage) -> Result<()> {
        match self.channel.send(message.as_bytes()) {
            Ok(()) => {
                self.stats.record_sent(message.len());
                trace!(
                    "Sent message type {:#x} ({} bytes) on {} channel",
                    message.type_id(),
                    message.len(),
                    self.kind
                );
                Ok(())
            }
            Err(err) => {
                self.stats.record_failure();
                warn!("Failed to send on {} channel: {}", self.kind, err);
                Err(err)
            }
        }
    }

    pub fn stats(&self) -> ChannelStatsSnapshot {
        self.stats.snapshot()
    }
}

impl fmt::Debug for ChannelSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSender")
            .field("kind", &self.kind)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

/// Transports for the control, feedback and telemetry channels
#[derive(Clone)]
pub struct ChannelSet {
    pub control: Arc<dyn MessageChannel>,
    pub feedback: Arc<dyn MessageChannel>,
    pub telemetry: Arc<dyn MessageChannel>,
}

impl ChannelSet {
    pub fn new(
        control: Arc<dyn MessageChannel>,
        feedback: Arc<dyn MessageChannel>,
        telemetry: Arc<dyn MessageChannel>,
    ) -> Self {
        Self {
            control,
            feedback,
            telemetry,
        }
    }

    /// Wrap each transport in a sender for its channel
    pub fn into_senders(self) -> [ChannelSender; 3] {
        [
            ChannelSender::new(ChannelKind::Control, self.control),
            ChannelSender::new(ChannelKind::Feedback, self.feedback),
            ChannelSender::new(ChannelKind::Telemetry, self.telemetry),
        ]
    }
}

impl fmt::Debug for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSet").finish_non_exhaustive()
    }
}
