//! Bounded in-process FIFO transport

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use crate::{
    error::{Result, ShmLinkError},
    messages::EncodedMessage,
};

use super::{sender::ChannelSet, traits::MessageChannel};

/// Default number of frames a queue channel holds
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// A bounded FIFO of frames.
///
/// A full queue rejects the send with a `Transport` error instead of blocking
/// or dropping the frame.
#[derive(Debug)]
pub struct QueueChannel {
    name: String,
    capacity: usize,
    frames: Mutex<VecDeque<Vec<u8>>>,
}

impl QueueChannel {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            frames: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_QUEUE_CAPACITY))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of queued frames
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Pop the oldest frame
    pub fn try_recv(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.pop_front())
    }

    /// Pop the oldest frame and validate it
    pub fn try_recv_message(&self) -> Result<Option<EncodedMessage>> {
        self.try_recv()?.map(EncodedMessage::from_bytes).transpose()
    }

    /// Remove every queued frame, oldest first
    pub fn drain(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self.lock()?.drain(..).collect())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, VecDeque<Vec<u8>>>> {
        self.frames
            .lock()
            .map_err(|_| ShmLinkError::transport(&self.name, "queue lock poisoned"))
    }
}

impl MessageChannel for QueueChannel {
    fn send(&self, frame: &[u8]) -> Result<()> {
        let mut frames = self.lock()?;
        if frames.len() >= self.capacity {
            return Err(ShmLinkError::transport(
                &self.name,
                format!("queue full ({} frames)", self.capacity),
            ));
        }
        frames.push_back(frame.to_vec());
        Ok(())
    }
}

/// One queue per logical channel, for in-process agents and tests
#[derive(Debug, Clone)]
pub struct QueueChannels {
    pub control: Arc<QueueChannel>,
    pub feedback: Arc<QueueChannel>,
    pub telemetry: Arc<QueueChannel>,
}

impl QueueChannels {
    pub fn new(capacity: usize) -> Self {
        Self {
            control: Arc::new(QueueChannel::new("control", capacity)),
            feedback: Arc::new(QueueChannel::new("feedback", capacity)),
            telemetry: Arc::new(QueueChannel::new("telemetry", capacity)),
        }
    }

    pub fn channel_set(&self) -> ChannelSet {
        ChannelSet::new(
            self.control.clone(),
            self.feedback.clone(),
            self.telemetry.clone(),
        )
    }
}

impl Default for QueueChannels {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
