//! Relation indexing
//!
//! One pass over the entity arena classifies every relation into the
//! typed adjacency maps the later stages traverse.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use radgraph_core::{AnnotationGraph, LoopFilterMode, RadGraphError, RelationKind, Result};

use crate::loop_filter::filter_loops;

// ============================================================================
// Adjacency Map
// ============================================================================

/// Arena position to an ordered list of arena positions
///
/// Keys iterate in first-insertion order and every list keeps the order
/// in which its values were pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyMap {
    keys: Vec<usize>,
    lists: HashMap<usize, Vec<usize>>,
}

impl AdjacencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the list stored under `key`
    pub fn push(&mut self, key: usize, value: usize) {
        match self.lists.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().push(value),
            Entry::Vacant(entry) => {
                self.keys.push(key);
                entry.insert(vec![value]);
            }
        }
    }

    /// Store a whole list under `key`, replacing any previous list
    pub fn insert(&mut self, key: usize, values: Vec<usize>) {
        if self.lists.insert(key, values).is_none() {
            self.keys.push(key);
        }
    }

    /// The list under `key`, empty when the key is absent
    pub fn get(&self, key: usize) -> &[usize] {
        self.lists.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_key(&self, key: usize) -> bool {
        self.lists.contains_key(&key)
    }

    /// Entries in key insertion order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.keys.iter().map(move |&key| (key, self.get(key)))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// ============================================================================
// Relation Index
// ============================================================================

/// Typed adjacency built from one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationIndex {
    /// Observation target -> observations that modify it
    pub obs_modified_by_obs: AdjacencyMap,
    /// Anatomy target -> anatomies that modify it
    pub anat_modify_anat: AdjacencyMap,
    /// Observation -> anatomies it is located at
    pub obs_located_anat: AdjacencyMap,
    /// Observation -> observations it is suggestive of
    pub obs_suggest_obs: AdjacencyMap,
    /// Main observations in document order
    pub main_observations: Vec<usize>,
}

impl RelationIndex {
    /// Index every relation of every entity in a single pass
    pub fn build(graph: &AnnotationGraph) -> Result<Self> {
        let mut index = Self::default();

        for (source, entity) in graph.entities().iter().enumerate() {
            if entity.is_main_observation() {
                index.main_observations.push(source);
            }

            for relation in &entity.relations {
                let target = graph.position(&relation.target).ok_or_else(|| {
                    RadGraphError::DanglingReference {
                        entity: entity.id.clone(),
                        relation: relation.kind.to_string(),
                        target: relation.target.clone(),
                    }
                })?;

                match relation.kind {
                    RelationKind::Modify => {
                        if entity.is_observation() {
                            index.obs_modified_by_obs.push(target, source);
                        }
                        if entity.is_anatomy() {
                            index.anat_modify_anat.push(target, source);
                        }
                    }
                    RelationKind::LocatedAt if entity.is_observation() => {
                        index.obs_located_anat.push(source, target);
                    }
                    RelationKind::SuggestiveOf if entity.is_observation() => {
                        index.obs_suggest_obs.push(source, target);
                    }
                    _ => {}
                }
            }
        }

        Ok(index)
    }

    /// Run the loop filter over both modifier maps
    pub fn with_loop_filter(mut self, mode: LoopFilterMode) -> Self {
        self.obs_modified_by_obs = filter_loops(&self.obs_modified_by_obs, mode);
        self.anat_modify_anat = filter_loops(&self.anat_modify_anat, mode);
        self
    }
}
