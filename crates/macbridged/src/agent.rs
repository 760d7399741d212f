//! Conventions of the external macOS sensor agent.
//!
//! The agent creates its own entities by POSTing states to the REST API;
//! nothing in this daemon produces sensor values. These constants describe
//! what the agent is known to publish so the reconciler can classify state
//! entries and enrich the registry records it creates.

/// Integration domain, also the first half of the device identity tuple.
pub const DOMAIN: &str = "hass_mac_sensor";

/// Entity namespace the agent publishes into.
pub const SENSOR_DOMAIN: &str = "sensor";

/// Value of the `source` attribute the agent stamps on its states.
pub const AGENT_SOURCE: &str = "hass_mac_sensor_agent";

/// Prefix of the `unique_id` attribute the agent stamps on its states.
pub const AGENT_UNIQUE_ID_PREFIX: &str = "hass_mac_sensor_agent_";

// Device presentation, shown once for the whole group of sensors.
pub const DEVICE_MANUFACTURER: &str = "HASS Mac Sensor Agent";
pub const DEVICE_MODEL: &str = "Mac";
pub const DEVICE_NAME: &str = "hass-ma";
pub const DEVICE_SW_VERSION: &str = "1.0.0";

/// Display metadata for one sensor the agent is known to publish.
#[derive(Debug, Clone, Copy)]
pub struct SensorMeta {
    pub object_id: &'static str,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub icon: &'static str,
    pub device_class: Option<&'static str>,
    pub state_class: Option<&'static str>,
}

/// Sensors published by the current agent version.
///
/// The reconciler associates unknown object ids too; they just get no display
/// metadata on their registry record.
pub const SENSOR_CATALOG: &[SensorMeta] = &[
    SensorMeta {
        object_id: "cpu_usage",
        name: "CPU Usage",
        unit: Some("%"),
        icon: "mdi:cpu-64-bit",
        device_class: None,
        state_class: Some("measurement"),
    },
    SensorMeta {
        object_id: "memory_usage",
        name: "Memory Usage",
        unit: Some("%"),
        icon: "mdi:memory",
        device_class: None,
        state_class: Some("measurement"),
    },
    SensorMeta {
        object_id: "disk_usage",
        name: "Disk Usage",
        unit: Some("%"),
        icon: "mdi:harddisk",
        device_class: None,
        state_class: Some("measurement"),
    },
    SensorMeta {
        object_id: "battery_level",
        name: "Battery Level",
        unit: Some("%"),
        icon: "mdi:battery",
        device_class: Some("battery"),
        state_class: Some("measurement"),
    },
    SensorMeta {
        object_id: "is_charging",
        name: "Is Charging",
        unit: None,
        icon: "mdi:power-plug",
        device_class: None,
        state_class: None,
    },
    SensorMeta {
        object_id: "is_active",
        name: "Is Active",
        unit: None,
        icon: "mdi:monitor",
        device_class: None,
        state_class: None,
    },
    SensorMeta {
        object_id: "uptime",
        name: "Uptime",
        unit: Some("h"),
        icon: "mdi:clock-outline",
        device_class: None,
        state_class: Some("measurement"),
    },
    SensorMeta {
        object_id: "network_sent",
        name: "Network Sent",
        unit: Some("MB"),
        icon: "mdi:upload",
        device_class: None,
        state_class: Some("measurement"),
    },
    SensorMeta {
        object_id: "network_received",
        name: "Network Received",
        unit: Some("MB"),
        icon: "mdi:download",
        device_class: None,
        state_class: Some("measurement"),
    },
];

/// Look up catalog metadata for an object id.
pub fn catalog_lookup(object_id: &str) -> Option<&'static SensorMeta> {
    SENSOR_CATALOG.iter().find(|m| m.object_id == object_id)
}

/// Split `sensor.cpu_usage` into `cpu_usage`, if the entity is in the sensor
/// namespace.
pub fn sensor_object_id(entity_id: &str) -> Option<&str> {
    entity_id
        .strip_prefix(SENSOR_DOMAIN)
        .and_then(|rest| rest.strip_prefix('.'))
        .filter(|object_id| !object_id.is_empty())
}
