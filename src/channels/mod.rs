//! Channels carrying encoded messages from a component to the agent

pub mod queue;
pub mod sender;
pub mod stats;
pub mod traits;

pub use queue::{QueueChannel, QueueChannels, DEFAULT_QUEUE_CAPACITY};
pub use sender::{ChannelKind, ChannelSender, ChannelSet};
pub use stats::{ChannelStats, ChannelStatsSnapshot};
pub use traits::MessageChannel;
