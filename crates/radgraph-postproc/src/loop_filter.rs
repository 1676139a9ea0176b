//! Reciprocal modifier pair filtering
//!
//! Two entities that modify each other would otherwise both appear in each
//! other's modifier closure. The default mode drops the later entry of such
//! a pair; traversal is cycle-safe either way.

use radgraph_core::LoopFilterMode;

use crate::index::AdjacencyMap;

/// Apply the loop filter to one modifier map
pub fn filter_loops(map: &AdjacencyMap, mode: LoopFilterMode) -> AdjacencyMap {
    match mode {
        LoopFilterMode::Passthrough => map.clone(),
        LoopFilterMode::DropReciprocal => drop_reciprocal(map),
    }
}

/// Keys are visited in insertion order. A key is dropped when the entry
/// already kept for its first modifier is exactly `[key]`.
fn drop_reciprocal(map: &AdjacencyMap) -> AdjacencyMap {
    let mut kept = AdjacencyMap::new();

    for (key, modifiers) in map.iter() {
        let reciprocal = modifiers
            .first()
            .is_some_and(|&head| kept.get(head) == [key].as_slice());

        if reciprocal {
            tracing::trace!(entity = key, "dropping reciprocal modifier entry");
            continue;
        }
        kept.insert(key, modifiers.to_vec());
    }

    kept
}
