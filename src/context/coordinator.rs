//! Per-process context coordinating regions, channels and shared configuration

use std::time::Duration;

use log::{debug, info, warn};

use crate::{
    channels::{ChannelKind, ChannelSender, ChannelSet, ChannelStatsSnapshot},
    config_store::{ComponentConfig, ConfigStorageHeader, SharedConfigRegion, SharedConfigStore},
    error::{Result, ShmLinkError},
    layout::{GlobalMemoryRegion, RegionPayload},
    memory::{wait_until, RegionView},
    messages::{EncodedMessage, RegisterMemoryRegionRequest},
};

use super::config::ContextConfig;

/// How long an opener waits for the creator of a region to write its id
pub const REGION_ID_WAIT: Duration = Duration::from_millis(250);

/// Entry point of a component process.
///
/// Holds the global memory region, the senders of the three channels and the
/// shared configuration store. Apart from these handles the context keeps no
/// state: every operation either completes or returns the failing
/// collaborator's error unchanged.
#[derive(Debug)]
pub struct Context<S: SharedConfigStore = SharedConfigRegion> {
    config: ContextConfig,
    global: RegionView<GlobalMemoryRegion>,
    control: ChannelSender,
    feedback: ChannelSender,
    telemetry: ChannelSender,
    store: S,
}

impl Context<SharedConfigRegion> {
    /// Open the context with the shared-region configuration store.
    ///
    /// The configuration region goes through the same registration protocol
    /// as any other region, so the agent learns about it over the control
    /// channel.
    pub fn open(config: ContextConfig, channels: ChannelSet) -> Result<Self> {
        config.validate()?;

        let global = open_global_region(&config)?;
        let [control, feedback, telemetry] = channels.into_senders();

        let storage = create_region::<ConfigStorageHeader>(
            &config,
            &global,
            &control,
            &config.config_region_name,
            config.config_region_size,
        )?;

        Ok(Self {
            config,
            global,
            control,
            feedback,
            telemetry,
            store: SharedConfigRegion::new(storage),
        })
    }
}

impl<S: SharedConfigStore> Context<S> {
    /// Open the context with a caller-provided configuration store
    pub fn with_store(config: ContextConfig, channels: ChannelSet, store: S) -> Result<Self> {
        config.validate()?;

        let global = open_global_region(&config)?;
        let [control, feedback, telemetry] = channels.into_senders();

        Ok(Self {
            config,
            global,
            control,
            feedback,
            telemetry,
            store,
        })
    }

    /// Create or open a named region and register it with the agent.
    ///
    /// The creating process assigns the region id from the global counter;
    /// an opening process keeps the id the creator wrote. Either way a
    /// registration request is sent on the control channel before the view
    /// is returned.
    ///
    /// The creator writes the id only after the segment is published. An
    /// opener that arrives in between waits up to [`REGION_ID_WAIT`] for it;
    /// if the creator never assigns one (it crashed, or created the region
    /// outside a context) the request carries `RegionId::UNASSIGNED`.
    pub fn create_memory_region<T: RegionPayload>(
        &self,
        name: &str,
        size: usize,
    ) -> Result<RegionView<T>> {
        create_region(&self.config, &self.global, &self.control, name, size)
    }

    /// Create or refresh the shared copy of a component configuration
    pub fn register_component_config<T: ComponentConfig>(&self, config: &mut T) -> Result<()> {
        self.store.create_or_update_from(config)
    }

    pub fn send_control_message(&self, message: &EncodedMessage) -> Result<()> {
        self.control.send_message(message)
    }

    pub fn send_feedback_message(&self, message: &EncodedMessage) -> Result<()> {
        self.feedback.send_message(message)
    }

    pub fn send_telemetry_message(&self, message: &EncodedMessage) -> Result<()> {
        self.telemetry.send_message(message)
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn config_store(&self) -> &S {
        &self.store
    }

    pub fn global_memory_region(&self) -> &RegionView<GlobalMemoryRegion> {
        &self.global
    }

    /// Number of region ids handed out so far, across all processes
    pub fn total_memory_region_count(&self) -> u64 {
        self.global.payload().total_memory_region_count()
    }

    pub fn channel_stats(&self, kind: ChannelKind) -> ChannelStatsSnapshot {
        match kind {
            ChannelKind::Control => self.control.stats(),
            ChannelKind::Feedback => self.feedback.stats(),
            ChannelKind::Telemetry => self.telemetry.stats(),
        }
    }
}

fn open_global_region(config: &ContextConfig) -> Result<RegionView<GlobalMemoryRegion>> {
    let (created, global) =
        RegionView::<GlobalMemoryRegion>::create_or_open(config.global_region_config())?;
    debug!(
        "{} global region {} (region count {})",
        if created { "Created" } else { "Attached to" },
        config.global_region_name,
        global.payload().total_memory_region_count()
    );
    Ok(global)
}

fn create_region<T: RegionPayload>(
    config: &ContextConfig,
    global: &RegionView<GlobalMemoryRegion>,
    control: &ChannelSender,
    name: &str,
    size: usize,
) -> Result<RegionView<T>> {
    if name == config.global_region_name {
        return Err(ShmLinkError::invalid_argument(
            "name",
            format!("{} is reserved for the global memory region", name),
        ));
    }

    let (created, view) = RegionView::<T>::create_or_open(config.region_config(name, size))?;

    // Id assignment and the registration send are adjacent; a crash in
    // between consumes the id without registering the region.
    if created {
        let region_id = global.payload().allocate_region_id();
        view.header().assign_region_id(region_id);
        info!("Assigned region id {} to {}", region_id, name);
    } else if !wait_until(REGION_ID_WAIT, || view.header().region_id().is_assigned()) {
        warn!("Region {} has no id assigned; registering it as unassigned", name);
    }

    let header = view.header();
    let request = RegisterMemoryRegionRequest {
        name: name.to_string(),
        region_size: header.region_size(),
        region_id: header.region_id(),
    };
    control.send_message(&EncodedMessage::encode(&request)?)?;

    Ok(view)
}
