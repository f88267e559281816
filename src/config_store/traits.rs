//! Contracts between the coordinator and a shared configuration store

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Configuration of one component instance, shareable across processes
pub trait ComponentConfig: Serialize + DeserializeOwned {
    /// Kind of component, e.g. `"smart-cache"`
    const COMPONENT_TYPE: &'static str;

    /// Distinguishes instances of the same component type
    fn instance_key(&self) -> String;

    /// Identity under which the configuration is stored
    fn config_key(&self) -> String {
        format!("{}/{}", Self::COMPONENT_TYPE, self.instance_key())
    }
}

/// Store holding the shared copy of every registered component configuration
pub trait SharedConfigStore {
    /// Store `config` if no entry with its identity exists; otherwise
    /// overwrite `config` with the shared entry.
    fn create_or_update_from<T: ComponentConfig>(&self, config: &mut T) -> Result<()>;
}
