//! Document pipeline
//!
//! Wires the stages together for one document and exposes the processor
//! used by callers.

use serde_json::value::RawValue;

use radgraph_core::{
    AnnotationDocument, AnnotationGraph, AnnotationInput, LoopFilterMode, ObservationRecord,
    OrderedMap, PostprocessConfig, ProcessedAnnotations, Result,
};

use crate::builder::{start_ix_to_label, ObservationBuilder};
use crate::index::RelationIndex;
use crate::AnnotationPostprocessor;

/// Observations extracted from a single document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentObservations {
    pub records: Vec<ObservationRecord>,
    pub start_ix_to_label: OrderedMap<String>,
}

/// Run every stage over a validated document
pub fn extract_observations(
    graph: &AnnotationGraph,
    loop_filter: LoopFilterMode,
) -> Result<DocumentObservations> {
    let index = RelationIndex::build(graph)?.with_loop_filter(loop_filter);
    tracing::debug!(
        entities = graph.len(),
        main_observations = index.main_observations.len(),
        %loop_filter,
        "indexed annotation relations"
    );

    let records = ObservationBuilder::new(graph, &index).build_all();

    Ok(DocumentObservations {
        records,
        start_ix_to_label: start_ix_to_label(graph),
    })
}

/// Post-processor configured for one RadGraph output layout
#[derive(Debug, Clone, Default)]
pub struct RadGraphPostprocessor {
    config: PostprocessConfig,
}

impl RadGraphPostprocessor {
    /// Create a processor with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: PostprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PostprocessConfig {
        &self.config
    }

    /// Extract observations from a document that is already unwrapped
    pub fn process_document(&self, document: &AnnotationDocument) -> Result<DocumentObservations> {
        let graph = AnnotationGraph::from_document(document)?;
        extract_observations(&graph, self.config.loop_filter)
    }

    /// Process a JSON model output, passing the input bytes through verbatim
    pub fn process_json(&self, json: &str) -> Result<ProcessedAnnotations> {
        let raw: Box<RawValue> = serde_json::from_str(json)?;
        let input: AnnotationInput = serde_json::from_str(raw.get())?;
        self.assemble(&input, raw)
    }

    /// Process many inputs, one result per input in input order.
    ///
    /// A failing input is logged and reported in its slot; the rest of the
    /// batch still runs.
    pub fn process_batch(&self, inputs: &[AnnotationInput]) -> Vec<Result<ProcessedAnnotations>> {
        inputs
            .iter()
            .enumerate()
            .map(|(position, input)| {
                let result = self.process(input);
                if let Err(e) = &result {
                    tracing::warn!(position, error = %e, "failed to process annotation input");
                }
                result
            })
            .collect()
    }

    fn assemble(
        &self,
        input: &AnnotationInput,
        raw: Box<RawValue>,
    ) -> Result<ProcessedAnnotations> {
        let document = input.document(&self.config.document_key)?;
        let graph = AnnotationGraph::from_document(document)?;
        let observations = extract_observations(&graph, self.config.loop_filter)?;

        Ok(ProcessedAnnotations {
            processed_annotations: observations.records,
            radgraph_annotations: raw,
            start_ix_to_label: observations.start_ix_to_label,
            radgraph_text: graph.text().to_string(),
        })
    }
}

impl AnnotationPostprocessor for RadGraphPostprocessor {
    fn process(&self, input: &AnnotationInput) -> Result<ProcessedAnnotations> {
        let raw = serde_json::value::to_raw_value(input)?;
        self.assemble(input, raw)
    }
}
