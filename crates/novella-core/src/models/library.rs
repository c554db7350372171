use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record stored under a collection path, saved with create-or-update semantics.
pub trait Resource {
    /// Collection path segment, e.g. `characters`.
    const COLLECTION: &'static str;

    /// Server id; `None` for records not yet created.
    fn id(&self) -> Option<i64>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Character {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "worldId", default, skip_serializing_if = "Option::is_none")]
    pub world_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Character {
    const COLLECTION: &'static str = "characters";

    fn id(&self) -> Option<i64> {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for World {
    const COLLECTION: &'static str = "worlds";

    fn id(&self) -> Option<i64> {
        self.id
    }
}
