//! The registry reconciliation pass.
//!
//! The macOS agent creates sensor entities by pushing states through the
//! REST API, so nothing ties them to a device record. Each pass scans the
//! current states, classifies agent-published sensors, and makes sure every
//! one of them has an entity-registry record linked to the single Mac device.
//! A pass is idempotent: with unchanged state it performs no mutations.

use std::sync::Arc;

use tracing::info;
use tracing::warn;

use crate::agent;
use crate::registry::DeviceDescriptor;
use crate::registry::DeviceIdentity;
use crate::registry::DeviceRecord;
use crate::registry::DeviceRegistry;
use crate::registry::EntityRegistry;
use crate::registry::NewEntity;
use crate::registry::RegistryError;
use crate::registry::StateEntry;
use crate::registry::StateStore;

/// Counters for one reconciliation pass. Informational only.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// State entries examined.
    pub scanned: usize,

    /// Entries classified as agent sensors.
    pub matched: usize,

    /// Entries newly linked to the device this pass.
    pub associated: usize,

    /// Matched entries whose registration failed this pass.
    pub failed: usize,
}

/// Whole-pass failure. Every error escaping a pass collapses into this one
/// kind; the coordinator decides what to do with it.
#[derive(Debug, thiserror::Error)]
#[error("registry reconciliation failed: {0}")]
pub struct UpdateError(#[from] RegistryError);

/// Periodically rewires registry associations for agent-published sensors.
pub struct Reconciler {
    devices: Arc<dyn DeviceRegistry>,
    entities: Arc<dyn EntityRegistry>,
    states: Arc<dyn StateStore>,
}

impl Reconciler {
    pub fn new(
        devices: Arc<dyn DeviceRegistry>,
        entities: Arc<dyn EntityRegistry>,
        states: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            devices,
            entities,
            states,
        }
    }

    /// Run one pass: resolve the device record, classify current states, and
    /// make sure every agent sensor is registered against the device.
    ///
    /// Per-entry registration failures are logged and skipped; the entry is
    /// picked up again on the next pass.
    pub async fn reconcile(&self) -> Result<ReconcileSummary, UpdateError> {
        let device = self.devices.get_or_create(device_descriptor()).await?;
        let entries = self.states.all().await?;

        let mut summary = ReconcileSummary {
            scanned: entries.len(),
            ..Default::default()
        };

        for entry in entries.iter().filter(|e| is_agent_sensor(e)) {
            summary.matched += 1;
            match self.associate(entry, &device).await {
                Ok(true) => summary.associated += 1,
                Ok(false) => {}
                Err(e) => {
                    summary.failed += 1;
                    warn!("failed to register {}: {}", entry.entity_id, e);
                }
            }
        }

        info!(
            scanned = summary.scanned,
            matched = summary.matched,
            associated = summary.associated,
            "reconciliation pass complete"
        );
        Ok(summary)
    }

    /// Ensure one agent sensor is linked to the device. Returns whether a
    /// registry mutation happened.
    async fn associate(
        &self,
        entry: &StateEntry,
        device: &DeviceRecord,
    ) -> Result<bool, RegistryError> {
        if let Some(existing) = self.entities.get(&entry.entity_id).await? {
            if existing.device_id.as_deref() == Some(device.id.as_str()) {
                return Ok(false);
            }
            self.entities
                .update_device(&entry.entity_id, Some(device.id.clone()))
                .await?;
            return Ok(true);
        }

        let record = self
            .entities
            .get_or_create(self.new_entity(entry, device))
            .await?;
        if record.entity_id != entry.entity_id {
            // The unique id was already registered under another entity id;
            // only its device link may need fixing.
            if record.device_id.as_deref() == Some(device.id.as_str()) {
                return Ok(false);
            }
            self.entities
                .update_device(&record.entity_id, Some(device.id.clone()))
                .await?;
        }
        Ok(true)
    }

    fn new_entity(&self, entry: &StateEntry, device: &DeviceRecord) -> NewEntity {
        let object_id = agent::sensor_object_id(&entry.entity_id).unwrap_or(&entry.entity_id);
        let unique_id = entry
            .attr_str("unique_id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}", agent::AGENT_UNIQUE_ID_PREFIX, object_id));
        let meta = agent::catalog_lookup(object_id);

        NewEntity {
            entity_id: entry.entity_id.clone(),
            unique_id,
            domain: agent::SENSOR_DOMAIN.to_string(),
            platform: agent::DOMAIN.to_string(),
            device_id: Some(device.id.clone()),
            name: meta.map(|m| m.name.to_string()),
            unit_of_measurement: meta.and_then(|m| m.unit).map(str::to_string),
            icon: meta.map(|m| m.icon.to_string()),
            device_class: meta.and_then(|m| m.device_class).map(str::to_string),
            state_class: meta.and_then(|m| m.state_class).map(str::to_string),
        }
    }
}

/// Device presentation used on first creation.
pub fn device_descriptor() -> DeviceDescriptor {
    DeviceDescriptor {
        identity: device_identity(),
        manufacturer: agent::DEVICE_MANUFACTURER.to_string(),
        model: agent::DEVICE_MODEL.to_string(),
        name: agent::DEVICE_NAME.to_string(),
        sw_version: agent::DEVICE_SW_VERSION.to_string(),
    }
}

/// Fixed identity key the device record is resolved by.
pub fn device_identity() -> DeviceIdentity {
    DeviceIdentity::new(agent::DOMAIN, agent::AGENT_SOURCE)
}

/// Decide whether a state entry was published by the agent.
///
/// Best-effort classification over the two conventions the agent is known to
/// emit: a `source` attribute, or a `unique_id` attribute with the agent
/// prefix. Entries matching neither are left alone; once the agent stamps
/// its attributes a later pass picks them up.
fn is_agent_sensor(entry: &StateEntry) -> bool {
    if agent::sensor_object_id(&entry.entity_id).is_none() {
        return false;
    }
    if entry.attr_str("source") == Some(agent::AGENT_SOURCE) {
        return true;
    }
    entry
        .attr_str("unique_id")
        .is_some_and(|id| id.starts_with(agent::AGENT_UNIQUE_ID_PREFIX))
}
