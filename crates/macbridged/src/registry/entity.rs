use async_trait::async_trait;

use super::RegistryError;

/// A persisted entity registration.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub entity_id: String,
    pub unique_id: String,

    /// Entity namespace (e.g. `sensor`).
    pub domain: String,

    /// Integration that owns the entity.
    pub platform: String,

    /// Device association. The only field the reconciler rewrites after
    /// creation.
    pub device_id: Option<String>,

    pub name: Option<String>,
    pub unit_of_measurement: Option<String>,
    pub icon: Option<String>,
    pub device_class: Option<String>,
    pub state_class: Option<String>,
}

/// Parameters for registering a new entity.
///
/// `entity_id` is a suggestion: when the unique id is already registered the
/// existing record wins, whatever entity id it carries.
#[derive(Debug, Clone)]
pub struct NewEntity {
    pub entity_id: String,
    pub unique_id: String,
    pub domain: String,
    pub platform: String,
    pub device_id: Option<String>,
    pub name: Option<String>,
    pub unit_of_measurement: Option<String>,
    pub icon: Option<String>,
    pub device_class: Option<String>,
    pub state_class: Option<String>,
}

#[async_trait]
pub trait EntityRegistry: Send + Sync {
    async fn get(&self, entity_id: &str) -> Result<Option<EntityRecord>, RegistryError>;

    /// Resolve by unique id, registering the entity on first use. Fails with
    /// `Conflict` when the suggested entity id is taken by a different
    /// unique id.
    async fn get_or_create(&self, entity: NewEntity) -> Result<EntityRecord, RegistryError>;

    /// Rewrite the device association of an existing entity.
    async fn update_device(
        &self,
        entity_id: &str,
        device_id: Option<String>,
    ) -> Result<EntityRecord, RegistryError>;
}
