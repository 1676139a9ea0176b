//! Observation record construction
//!
//! For each main observation the builder resolves its modifier closure
//! into a phrase, picks a certainty tag, and resolves the anatomy it is
//! located at and the findings it suggests.

use radgraph_core::{AnnotationGraph, Certainty, ObservationRecord, OrderedMap};

use crate::index::RelationIndex;
use crate::ordering::OrderedSpans;
use crate::resolver::resolve_modifiers;
use crate::substring::{filter_substrings, retain_maximal};

/// Builds observation records from an indexed document
pub struct ObservationBuilder<'g> {
    graph: &'g AnnotationGraph,
    index: &'g RelationIndex,
}

impl<'g> ObservationBuilder<'g> {
    pub fn new(graph: &'g AnnotationGraph, index: &'g RelationIndex) -> Self {
        Self { graph, index }
    }

    /// One record per main observation, in document order
    pub fn build_all(&self) -> Vec<ObservationRecord> {
        self.index
            .main_observations
            .iter()
            .map(|&observation| self.build(observation))
            .collect()
    }

    /// Build the record for the observation at arena position `observation`
    pub fn build(&self, observation: usize) -> ObservationRecord {
        let closure = resolve_modifiers(self.graph, observation, &self.index.obs_modified_by_obs);
        let tag = select_tag(closure.iter().filter_map(|e| e.certainty()));
        let ordered = OrderedSpans::from_spans(&closure).deduplicated();
        let (located_at, located_at_start_ix) = self.located_at(observation);

        ObservationRecord {
            observation: ordered.phrase(),
            observation_start_ix: ordered.start_ix,
            located_at,
            located_at_start_ix,
            tags: vec![tag],
            suggestive_of: self.suggestive_of(observation),
            observation_end_ix: ordered.end_ix,
        }
    }

    /// Anatomy phrases with their sorted start offsets, substring-filtered
    fn located_at(&self, observation: usize) -> (Vec<String>, Vec<Vec<usize>>) {
        let anatomies = self.index.obs_located_anat.get(observation);
        if anatomies.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let (phrases, starts): (Vec<String>, Vec<Vec<usize>>) = anatomies
            .iter()
            .map(|&anatomy| {
                let closure = resolve_modifiers(self.graph, anatomy, &self.index.anat_modify_anat);
                let ordered = OrderedSpans::from_spans(&closure);
                (ordered.phrase(), ordered.start_ix)
            })
            .unzip();

        retain_maximal(&phrases)
            .into_iter()
            .map(|i| (phrases[i].clone(), starts[i].clone()))
            .unzip()
    }

    /// `None` when the observation suggests nothing; otherwise the filtered
    /// "<observation> suggestive of <target>" phrases built from raw tokens
    fn suggestive_of(&self, observation: usize) -> Option<Vec<String>> {
        let targets = self.index.obs_suggest_obs.get(observation);
        if targets.is_empty() {
            return None;
        }

        let source = &self.graph.entity(observation).tokens;
        let phrases: Vec<String> = targets
            .iter()
            .map(|&target| {
                format!(
                    "{} suggestive of {}",
                    source,
                    self.graph.entity(target).tokens
                )
            })
            .collect();

        Some(filter_substrings(&phrases))
    }
}

/// Certainty tag of a modifier closure: absent outranks uncertain, which
/// outranks present
pub fn select_tag(certainties: impl IntoIterator<Item = Certainty>) -> Certainty {
    let certainties: Vec<Certainty> = certainties.into_iter().collect();

    if certainties.contains(&Certainty::DefinitelyAbsent) {
        Certainty::DefinitelyAbsent
    } else if certainties.contains(&Certainty::Uncertain) {
        Certainty::Uncertain
    } else {
        Certainty::DefinitelyPresent
    }
}

/// Stringified start offset to label for every entity; a later entity
/// sharing a start offset overwrites the earlier label
pub fn start_ix_to_label(graph: &AnnotationGraph) -> OrderedMap<String> {
    graph
        .entities()
        .iter()
        .map(|e| (e.start_ix.to_string(), e.label.clone()))
        .collect()
}
