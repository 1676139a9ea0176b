//! RadGraph Post-processing - Observation extraction pipeline
//!
//! Turns the entity-relation graph produced by a RadGraph model into a
//! flat list of clinical observations: the finding phrase, its certainty
//! tag, where it is located and what it suggests.
//!
//! Stages run strictly one way per document:
//! relation indexing, loop filtering, modifier resolution and ordering,
//! observation building, substring filtering.

use radgraph_core::{AnnotationInput, ProcessedAnnotations, Result};

/// Trait for annotation post-processors
///
/// Implementations hold no per-document state, so one instance can be
/// shared by any number of callers.
pub trait AnnotationPostprocessor: Send + Sync {
    fn process(&self, input: &AnnotationInput) -> Result<ProcessedAnnotations>;
}

pub mod builder;
pub mod index;
pub mod loop_filter;
pub mod ordering;
pub mod pipeline;
pub mod resolver;
pub mod substring;

pub use builder::{select_tag, start_ix_to_label, ObservationBuilder};
pub use index::{AdjacencyMap, RelationIndex};
pub use loop_filter::filter_loops;
pub use ordering::{normalize_phrase, sort_words_by_index, OrderedSpans};
pub use pipeline::{extract_observations, DocumentObservations, RadGraphPostprocessor};
pub use resolver::resolve_modifiers;
pub use substring::{filter_substrings, retain_maximal};
