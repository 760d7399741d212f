//! In-memory registry and state-store implementations.
//!
//! These back the daemon for its lifetime and double as the substitute
//! implementations in tests. Records are cloned out on read; locks are never
//! held across an await.

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::RwLock;

use async_trait::async_trait;

use super::DeviceDescriptor;
use super::DeviceIdentity;
use super::DeviceRecord;
use super::DeviceRegistry;
use super::EntityRecord;
use super::EntityRegistry;
use super::NewEntity;
use super::RegistryError;
use super::StateEntry;
use super::StateStore;

/// State store backing the REST states surface.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: RwLock<HashMap<String, StateEntry>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry. Returns true when the entity id was not
    /// present before.
    pub fn upsert(&self, entry: StateEntry) -> bool {
        let mut entries = self.entries.write().expect("state store lock poisoned");
        entries.insert(entry.entity_id.clone(), entry).is_none()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn all(&self) -> Result<Vec<StateEntry>, RegistryError> {
        let entries = self.entries.read().expect("state store lock poisoned");
        Ok(entries.values().cloned().collect())
    }

    async fn get(&self, entity_id: &str) -> Result<Option<StateEntry>, RegistryError> {
        let entries = self.entries.read().expect("state store lock poisoned");
        Ok(entries.get(entity_id).cloned())
    }
}

#[derive(Debug, Default)]
struct EntityMaps {
    /// entity_id -> record
    entities: HashMap<String, EntityRecord>,
    /// unique_id -> entity_id
    by_unique: HashMap<String, String>,
}

/// Entity registry keyed by entity id, with a unique-id index for
/// get-or-create resolution.
#[derive(Debug, Default)]
pub struct MemoryEntityRegistry {
    inner: RwLock<EntityMaps>,
}

impl MemoryEntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityRegistry for MemoryEntityRegistry {
    async fn get(&self, entity_id: &str) -> Result<Option<EntityRecord>, RegistryError> {
        let inner = self.inner.read().expect("entity registry lock poisoned");
        Ok(inner.entities.get(entity_id).cloned())
    }

    async fn get_or_create(&self, entity: NewEntity) -> Result<EntityRecord, RegistryError> {
        let mut inner = self.inner.write().expect("entity registry lock poisoned");

        if let Some(entity_id) = inner.by_unique.get(&entity.unique_id) {
            if let Some(record) = inner.entities.get(entity_id) {
                return Ok(record.clone());
            }
        }

        if inner.entities.contains_key(&entity.entity_id) {
            return Err(RegistryError::Conflict(entity.entity_id));
        }

        let record = EntityRecord {
            entity_id: entity.entity_id,
            unique_id: entity.unique_id,
            domain: entity.domain,
            platform: entity.platform,
            device_id: entity.device_id,
            name: entity.name,
            unit_of_measurement: entity.unit_of_measurement,
            icon: entity.icon,
            device_class: entity.device_class,
            state_class: entity.state_class,
        };
        inner
            .by_unique
            .insert(record.unique_id.clone(), record.entity_id.clone());
        inner
            .entities
            .insert(record.entity_id.clone(), record.clone());
        Ok(record)
    }

    async fn update_device(
        &self,
        entity_id: &str,
        device_id: Option<String>,
    ) -> Result<EntityRecord, RegistryError> {
        let mut inner = self.inner.write().expect("entity registry lock poisoned");
        let record = inner
            .entities
            .get_mut(entity_id)
            .ok_or_else(|| RegistryError::NotFound(entity_id.to_string()))?;
        record.device_id = device_id;
        Ok(record.clone())
    }
}

/// Device registry with counter-generated internal ids.
#[derive(Debug)]
pub struct MemoryDeviceRegistry {
    devices: RwLock<HashMap<DeviceIdentity, DeviceRecord>>,
    next_id: AtomicU64,
}

impl MemoryDeviceRegistry {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryDeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceRegistry for MemoryDeviceRegistry {
    async fn get_or_create(
        &self,
        descriptor: DeviceDescriptor,
    ) -> Result<DeviceRecord, RegistryError> {
        let mut devices = self.devices.write().expect("device registry lock poisoned");

        if let Some(record) = devices.get(&descriptor.identity) {
            return Ok(record.clone());
        }

        let record = DeviceRecord {
            id: format!("dev-{}", self.next_id.fetch_add(1, Ordering::Relaxed)),
            identity: descriptor.identity,
            manufacturer: descriptor.manufacturer,
            model: descriptor.model,
            name: descriptor.name,
            sw_version: descriptor.sw_version,
        };
        devices.insert(record.identity.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, identity: &DeviceIdentity) -> Result<Option<DeviceRecord>, RegistryError> {
        let devices = self.devices.read().expect("device registry lock poisoned");
        Ok(devices.get(identity).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(entity_id: &str, state: &str) -> StateEntry {
        StateEntry {
            entity_id: entity_id.to_string(),
            state: state.to_string(),
            attributes: serde_json::Map::new(),
        }
    }

    fn new_entity(entity_id: &str, unique_id: &str) -> NewEntity {
        NewEntity {
            entity_id: entity_id.to_string(),
            unique_id: unique_id.to_string(),
            domain: "sensor".to_string(),
            platform: "hass_mac_sensor".to_string(),
            device_id: None,
            name: None,
            unit_of_measurement: None,
            icon: None,
            device_class: None,
            state_class: None,
        }
    }

    #[tokio::test]
    async fn test_state_store_upsert_and_get() {
        let store = MemoryStateStore::new();
        assert!(store.upsert(entry("sensor.cpu_usage", "10.0")));
        assert!(!store.upsert(entry("sensor.cpu_usage", "11.0")));

        let current = store.get("sensor.cpu_usage").await.unwrap().unwrap();
        assert_eq!(current.state, "11.0");
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_entity_get_or_create_returns_existing_by_unique_id() {
        let registry = MemoryEntityRegistry::new();
        let first = registry
            .get_or_create(new_entity("sensor.cpu_usage", "uid-1"))
            .await
            .unwrap();
        let second = registry
            .get_or_create(new_entity("sensor.cpu_usage_renamed", "uid-1"))
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_entity_create_conflict_on_taken_entity_id() {
        let registry = MemoryEntityRegistry::new();
        registry
            .get_or_create(new_entity("sensor.cpu_usage", "uid-1"))
            .await
            .unwrap();
        let err = registry
            .get_or_create(new_entity("sensor.cpu_usage", "uid-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_entity_update_device_missing() {
        let registry = MemoryEntityRegistry::new();
        let err = registry
            .update_device("sensor.nope", Some("dev-1".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_device_identity_resolves_to_same_record() {
        let registry = MemoryDeviceRegistry::new();
        let descriptor = DeviceDescriptor {
            identity: DeviceIdentity::new("hass_mac_sensor", "hass_mac_sensor_agent"),
            manufacturer: "HASS Mac Sensor Agent".to_string(),
            model: "Mac".to_string(),
            name: "hass-ma".to_string(),
            sw_version: "1.0.0".to_string(),
        };

        let first = registry.get_or_create(descriptor.clone()).await.unwrap();
        let second = registry.get_or_create(descriptor).await.unwrap();
        assert_eq!(first.id, second.id);
    }
}
