//! Basic usage: open a context, create a region, publish a component config
//! and send a custom flat message on the telemetry channel.

use serde::{Deserialize, Serialize};
use shmlink::{
    channels::QueueChannels,
    flat::{
        checked_range, read_str, read_u64_at, serialize_variable_data, variable_data_size,
        write_u64_at, VARIABLE_FIELD_SIZE,
    },
    messages::RegisterMemoryRegionRequest,
    ComponentConfig, Context, ContextConfig, EncodedMessage, FlatMessage, Result,
};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheConfig {
    name: String,
    capacity: u64,
}

impl ComponentConfig for CacheConfig {
    const COMPONENT_TYPE: &'static str = "smart-cache";

    fn instance_key(&self) -> String {
        self.name.clone()
    }
}

/// Component name and state, followed by a counter
#[derive(Debug)]
struct ComponentStatus {
    component: String,
    state: String,
    hits: u64,
}

impl FlatMessage for ComponentStatus {
    const TYPE_ID: u32 = 0x0002_0001;
    const HEAD_SIZE: usize = 2 * VARIABLE_FIELD_SIZE + 8;

    fn variable_data_size(&self) -> usize {
        variable_data_size(self.component.as_str()) + variable_data_size(self.state.as_str())
    }

    fn serialize(&self, buffer: &mut [u8], object_offset: usize, data_offset: usize) -> Result<usize> {
        checked_range(buffer.len(), object_offset, Self::HEAD_SIZE)?;
        checked_range(buffer.len(), data_offset, self.variable_data_size())?;

        let mut written =
            serialize_variable_data(buffer, object_offset, data_offset, self.component.as_str())?;
        written += serialize_variable_data(
            buffer,
            object_offset + VARIABLE_FIELD_SIZE,
            data_offset + written,
            self.state.as_str(),
        )?;
        write_u64_at(buffer, object_offset + 2 * VARIABLE_FIELD_SIZE, self.hits)?;
        Ok(written)
    }

    fn deserialize(buffer: &[u8], object_offset: usize) -> Result<Self> {
        Ok(Self {
            component: read_str(buffer, object_offset)?.to_string(),
            state: read_str(buffer, object_offset + VARIABLE_FIELD_SIZE)?.to_string(),
            hits: read_u64_at(buffer, object_offset + 2 * VARIABLE_FIELD_SIZE)?,
        })
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let dir = std::env::temp_dir().join(format!("shmlink-demo-{}", std::process::id()));
    std::fs::create_dir_all(&dir)
        .map_err(|e| shmlink::ShmLinkError::from_io("demo", e, "Failed to create demo directory"))?;

    let channels = QueueChannels::default();
    let context = Context::open(ContextConfig::new().with_directory(&dir), channels.channel_set())?;

    let cache = context.create_memory_region::<AtomicU64>("smart-cache.hits", 4096)?;
    cache.payload().fetch_add(42, Ordering::AcqRel);
    println!(
        "Region '{}' has id {} ({} regions allocated)",
        cache.name(),
        cache.region_id(),
        context.total_memory_region_count()
    );

    let mut config = CacheConfig {
        name: "lru".to_string(),
        capacity: 512,
    };
    context.register_component_config(&mut config)?;
    println!("Registered config {:?}", config);

    let status = ComponentStatus {
        component: "smart-cache".to_string(),
        state: "warm".to_string(),
        hits: cache.payload().load(Ordering::Acquire),
    };
    context.send_telemetry_message(&EncodedMessage::encode(&status)?)?;

    println!("\nControl channel:");
    while let Some(frame) = channels.control.try_recv_message()? {
        let request: RegisterMemoryRegionRequest = frame.decode()?;
        println!("  {:?}", request);
    }

    println!("\nTelemetry channel:");
    while let Some(frame) = channels.telemetry.try_recv_message()? {
        let status: ComponentStatus = frame.decode()?;
        println!("  {:?}", status);
    }

    if let Err(e) = std::fs::remove_dir_all(&dir) {
        log::warn!("Failed to remove {}: {}", dir.display(), e);
    }

    Ok(())
}
