//! Modifier closure resolution
//!
//! Collects every entity that reaches a start entity through "modifies"
//! edges. The traversal is an iterative post-order DFS: a node's modifiers
//! are emitted (in adjacency order) before the node itself. A node is
//! marked visited when first entered, so cycles terminate and each entity
//! appears at most once per call.

use std::collections::HashSet;

use radgraph_core::{AnnotationGraph, Entity};

use crate::index::AdjacencyMap;

/// Resolve the modifier closure of `start`, descendants first, `start` last
pub fn resolve_modifiers<'g>(
    graph: &'g AnnotationGraph,
    start: usize,
    adjacency: &AdjacencyMap,
) -> Vec<&'g Entity> {
    let mut closure = Vec::new();
    let mut visited = HashSet::from([start]);
    // (node, index of the next modifier to enter)
    let mut stack = vec![(start, 0usize)];

    while let Some(frame) = stack.last_mut() {
        let node = frame.0;
        match adjacency.get(node).get(frame.1) {
            Some(&modifier) => {
                frame.1 += 1;
                if visited.insert(modifier) {
                    stack.push((modifier, 0));
                } else {
                    tracing::trace!(
                        entity = %graph.entity(modifier).id,
                        "modifier already visited, skipping"
                    );
                }
            }
            None => {
                stack.pop();
                closure.push(graph.entity(node));
            }
        }
    }

    closure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::RelationIndex;
    use radgraph_core::RelationKind;

    fn observation(id: &str, tokens: &str, start: usize) -> Entity {
        Entity::new(id, tokens, "Observation::definitely present", start, start)
    }

    fn ids(closure: &[&Entity]) -> Vec<String> {
        closure.iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn test_chain_closure_post_order() {
        // A modifies B, B modifies C
        let graph = AnnotationGraph::from_entities(
            vec![
                observation("A", "small", 0).with_relation(RelationKind::Modify, "B"),
                observation("B", "left", 1).with_relation(RelationKind::Modify, "C"),
                observation("C", "effusion", 2),
            ],
            "small left effusion",
        )
        .unwrap();
        let index = RelationIndex::build(&graph).unwrap();

        let closure = resolve_modifiers(&graph, 2, &index.obs_modified_by_obs);
        assert_eq!(ids(&closure), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = AnnotationGraph::from_entities(
            vec![
                observation("A", "patchy", 0).with_relation(RelationKind::Modify, "B"),
                observation("B", "opacity", 1).with_relation(RelationKind::Modify, "A"),
            ],
            "patchy opacity",
        )
        .unwrap();
        let index = RelationIndex::build(&graph).unwrap();

        let from_a = resolve_modifiers(&graph, 0, &index.obs_modified_by_obs);
        let from_b = resolve_modifiers(&graph, 1, &index.obs_modified_by_obs);
        assert_eq!(ids(&from_a), vec!["B", "A"]);
        assert_eq!(ids(&from_b), vec!["A", "B"]);
    }

    #[test]
    fn test_siblings_follow_adjacency_order() {
        let graph = AnnotationGraph::from_entities(
            vec![
                observation("0", "effusion", 3),
                observation("1", "large", 1).with_relation(RelationKind::Modify, "0"),
                observation("2", "very", 0).with_relation(RelationKind::Modify, "1"),
                observation("3", "layering", 2).with_relation(RelationKind::Modify, "0"),
            ],
            "very large layering effusion",
        )
        .unwrap();
        let index = RelationIndex::build(&graph).unwrap();

        let closure = resolve_modifiers(&graph, 0, &index.obs_modified_by_obs);
        assert_eq!(ids(&closure), vec!["2", "1", "3", "0"]);
    }

    #[test]
    fn test_diamond_visits_shared_node_once() {
        // D modifies both B and C, which both modify A
        let graph = AnnotationGraph::from_entities(
            vec![
                observation("A", "opacity", 3),
                observation("B", "hazy", 1).with_relation(RelationKind::Modify, "A"),
                observation("C", "patchy", 2).with_relation(RelationKind::Modify, "A"),
                observation("D", "mild", 0)
                    .with_relation(RelationKind::Modify, "B")
                    .with_relation(RelationKind::Modify, "C"),
            ],
            "mild hazy patchy opacity",
        )
        .unwrap();
        let index = RelationIndex::build(&graph).unwrap();

        let closure = resolve_modifiers(&graph, 0, &index.obs_modified_by_obs);
        assert_eq!(ids(&closure), vec!["D", "B", "C", "A"]);
    }

    #[test]
    fn test_isolated_entity() {
        let graph =
            AnnotationGraph::from_entities(vec![observation("0", "pneumothorax", 0)], "").unwrap();
        let closure = resolve_modifiers(&graph, 0, &AdjacencyMap::new());
        assert_eq!(ids(&closure), vec!["0"]);
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let depth = 50_000;
        let entities: Vec<Entity> = (0..depth)
            .map(|i| {
                let entity = observation(&i.to_string(), "x", i);
                if i + 1 < depth {
                    entity.with_relation(RelationKind::Modify, (i + 1).to_string())
                } else {
                    entity
                }
            })
            .collect();
        let graph = AnnotationGraph::from_entities(entities, "").unwrap();
        let index = RelationIndex::build(&graph).unwrap();

        let closure = resolve_modifiers(&graph, depth - 1, &index.obs_modified_by_obs);
        assert_eq!(closure.len(), depth);
        assert_eq!(closure[0].id, "0");
    }
}
