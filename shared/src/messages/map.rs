//! Generated map content streamed back by the worker

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Kind of a placed object, which decides the catalog table its name comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Npc,
    Object,
    Exit,
    #[serde(other)]
    Other,
}

/// An object placed on a generated map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapObject {
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Coordinates and anything else the worker attaches
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One map of a batch, keyed by the worker-assigned id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMap {
    pub id: u32,
    #[serde(default)]
    pub objects: Vec<MapObject>,
    /// Layout data (offsets, size, collision rows) carried through untouched
    #[serde(flatten)]
    pub layout: Map<String, Value>,
}

/// All maps produced by one `$map` cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapBatch {
    pub maps: BTreeMap<u32, GeneratedMap>,
}

impl MapBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a streamed map, a repeated id replaces the earlier one
    pub fn insert(&mut self, map: GeneratedMap) {
        self.maps.insert(map.id, map);
    }

    pub fn get(&self, id: u32) -> Option<&GeneratedMap> {
        self.maps.get(&id)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn objects_mut(&mut self) -> impl Iterator<Item = &mut MapObject> {
        self.maps.values_mut().flat_map(|map| map.objects.iter_mut())
    }
}
