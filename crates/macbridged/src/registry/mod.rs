//! Record types and capability traits for the host-side registries.
//!
//! The reconciler only ever sees these traits. The daemon wires them to the
//! in-memory implementations; tests substitute their own.

mod device;
mod entity;
mod memory;
mod state;

pub use device::DeviceDescriptor;
pub use device::DeviceIdentity;
pub use device::DeviceRecord;
pub use device::DeviceRegistry;
pub use entity::EntityRecord;
pub use entity::EntityRegistry;
pub use entity::NewEntity;
pub use memory::MemoryDeviceRegistry;
pub use memory::MemoryEntityRegistry;
pub use memory::MemoryStateStore;
pub use state::StateEntry;
pub use state::StateStore;

/// Errors surfaced by registry capability implementations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("entity id already registered: {0}")]
    Conflict(String),

    #[error("entity not found: {0}")]
    NotFound(String),
}
