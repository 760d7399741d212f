use async_trait::async_trait;

use super::RegistryError;

/// Identity key of a device: a fixed `(domain, id)` tuple.
///
/// Get-or-create resolves the same tuple to the same record for the lifetime
/// of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub domain: String,
    pub id: String,
}

impl DeviceIdentity {
    pub fn new(domain: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            id: id.into(),
        }
    }
}

/// Presentation fields applied when a device is first created.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub identity: DeviceIdentity,
    pub manufacturer: String,
    pub model: String,
    pub name: String,
    pub sw_version: String,
}

/// A registered device with its stable internal id.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    /// Internal id other records link against.
    pub id: String,
    pub identity: DeviceIdentity,
    pub manufacturer: String,
    pub model: String,
    pub name: String,
    pub sw_version: String,
}

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Resolve the identity key, creating the record on first use. An
    /// existing record is returned unchanged.
    async fn get_or_create(
        &self,
        descriptor: DeviceDescriptor,
    ) -> Result<DeviceRecord, RegistryError>;

    async fn get(&self, identity: &DeviceIdentity) -> Result<Option<DeviceRecord>, RegistryError>;
}
