use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use super::RegistryError;

/// A current entity state as held by the state store.
///
/// External input from the reconciler's perspective: the agent writes these
/// through the REST API and the reconciler only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub entity_id: String,

    /// Current value. Numeric readings arrive as their string rendering,
    /// matching the REST states contract.
    pub state: String,

    /// Free-form attribute map. May carry the agent's `source` and
    /// `unique_id` tags.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl StateEntry {
    /// Read a string-valued attribute.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Read access to the live state store.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// All current entries, in no particular order.
    async fn all(&self) -> Result<Vec<StateEntry>, RegistryError>;

    /// One entry by entity id.
    async fn get(&self, entity_id: &str) -> Result<Option<StateEntry>, RegistryError>;
}
