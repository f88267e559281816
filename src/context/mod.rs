//! The per-process coordination hub

pub mod config;
pub mod coordinator;

pub use config::{ContextConfig, ENV_BACKING, ENV_CONFIG_REGION, ENV_DIRECTORY, ENV_GLOBAL_REGION};
pub use coordinator::{Context, REGION_ID_WAIT};
