//! Annotation documents and the per-document entity arena
//!
//! RadGraph emits entities as a JSON object keyed by entity id. Key order
//! is significant (observations are reported in the order they appear), so
//! objects are read into an insertion-ordered map rather than a hash map.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Entity, RadGraphError, Relation, Result};

// ============================================================================
// Ordered Map
// ============================================================================

/// String-keyed map that remembers insertion order
///
/// Re-inserting an existing key replaces the value in place and keeps the
/// key's original position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Insert a value, returning the previous value for the key if any
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.index.get(&key) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        mut access: A,
    ) -> std::result::Result<Self::Value, A::Error> {
        let mut map = OrderedMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

// ============================================================================
// Wire Documents
// ============================================================================

/// An entity as emitted by the extraction model, before validation
///
/// Every field is optional on the wire so that a missing field can be
/// reported against the entity id instead of as a generic parse error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_ix: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ix: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<Relation>>,
}

impl RawEntity {
    /// Check required fields and produce an `Entity` with the given id
    pub fn validate(&self, id: &str) -> Result<Entity> {
        let missing = |field: &'static str| RadGraphError::MissingField {
            entity: id.to_string(),
            field,
        };

        Ok(Entity {
            id: id.to_string(),
            tokens: self.tokens.clone().ok_or_else(|| missing("tokens"))?,
            label: self.label.clone().ok_or_else(|| missing("label"))?,
            start_ix: self.start_ix.ok_or_else(|| missing("start_ix"))?,
            end_ix: self.end_ix.ok_or_else(|| missing("end_ix"))?,
            relations: self.relations.clone().ok_or_else(|| missing("relations"))?,
        })
    }
}

impl From<&Entity> for RawEntity {
    fn from(entity: &Entity) -> Self {
        Self {
            tokens: Some(entity.tokens.clone()),
            label: Some(entity.label.clone()),
            start_ix: Some(entity.start_ix),
            end_ix: Some(entity.end_ix),
            relations: Some(entity.relations.clone()),
        }
    }
}

/// Entities of one document keyed by id, in model order
pub type EntityMap = OrderedMap<RawEntity>;

/// One annotated sentence or report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDocument {
    pub entities: EntityMap,
    pub text: String,
}

impl AnnotationDocument {
    /// Build a document from validated entities
    pub fn from_entities<'a>(
        entities: impl IntoIterator<Item = &'a Entity>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            entities: entities
                .into_iter()
                .map(|e| (e.id.clone(), RawEntity::from(e)))
                .collect(),
            text: text.into(),
        }
    }
}

/// Model output keyed by document key (RadGraph uses `"0"` for a single
/// sentence)
pub type AnnotationInput = OrderedMap<AnnotationDocument>;

impl OrderedMap<AnnotationDocument> {
    /// Wrap a single document under `key`
    pub fn single(key: impl Into<String>, document: AnnotationDocument) -> Self {
        let mut input = Self::with_capacity(1);
        input.insert(key, document);
        input
    }

    /// Look up the document stored under `key`
    pub fn document(&self, key: &str) -> Result<&AnnotationDocument> {
        self.get(key)
            .ok_or_else(|| RadGraphError::MissingDocument(key.to_string()))
    }
}

// ============================================================================
// Entity Arena
// ============================================================================

/// Validated entities of one document, addressed by arena position or id
///
/// Construction guarantees that every relation target names an entity of
/// the same document.
#[derive(Debug, Clone)]
pub struct AnnotationGraph {
    entities: Vec<Entity>,
    positions: HashMap<String, usize>,
    text: String,
}

impl AnnotationGraph {
    /// Validate a wire document into an arena
    pub fn from_document(document: &AnnotationDocument) -> Result<Self> {
        let entities = document
            .entities
            .iter()
            .map(|(id, raw)| raw.validate(id))
            .collect::<Result<Vec<_>>>()?;

        Self::from_entities(entities, document.text.clone())
    }

    /// Build an arena from already validated entities
    pub fn from_entities(entities: Vec<Entity>, text: impl Into<String>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(entities.len());
        for (pos, entity) in entities.iter().enumerate() {
            if positions.insert(entity.id.clone(), pos).is_some() {
                return Err(RadGraphError::InvalidDocument(format!(
                    "duplicate entity id {}",
                    entity.id
                )));
            }
        }

        let graph = Self {
            entities,
            positions,
            text: text.into(),
        };
        graph.check_references()?;
        Ok(graph)
    }

    fn check_references(&self) -> Result<()> {
        for entity in &self.entities {
            for relation in &entity.relations {
                if !self.positions.contains_key(&relation.target) {
                    return Err(RadGraphError::DanglingReference {
                        entity: entity.id.clone(),
                        relation: relation.kind.to_string(),
                        target: relation.target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// All entities in document order
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Entity at an arena position
    ///
    /// Positions come from [`AnnotationGraph::position`] and are always in
    /// bounds for the graph that produced them.
    pub fn entity(&self, pos: usize) -> &Entity {
        &self.entities[pos]
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.position(id).map(|pos| &self.entities[pos])
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
