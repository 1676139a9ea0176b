//! RadGraph Core - Annotation model, errors and configuration
//!
//! This crate defines the types shared by the post-processing pipeline:
//! - Entities and typed relations of a RadGraph annotation
//! - The per-document entity arena (`AnnotationGraph`)
//! - Observation records and the processed output document
//! - Common error types
//! - Configuration management

pub mod config;
pub mod document;

pub use config::{AppConfig, ConfigError, LoggingConfig, LoopFilterMode, PostprocessConfig};
pub use document::{
    AnnotationDocument, AnnotationGraph, AnnotationInput, EntityMap, OrderedMap, RawEntity,
};

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for annotation post-processing
#[derive(Error, Debug)]
pub enum RadGraphError {
    #[error("Entity {entity} has a '{relation}' relation to unknown entity {target}")]
    DanglingReference {
        entity: String,
        relation: String,
        target: String,
    },

    #[error("Entity {entity} is missing required field '{field}'")]
    MissingField { entity: String, field: &'static str },

    #[error("Document key not found in input: {0}")]
    MissingDocument(String),

    #[error("Invalid annotation document: {0}")]
    InvalidDocument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for RadGraphError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidDocument(err.to_string())
    }
}

impl From<ConfigError> for RadGraphError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RadGraphError>;

// ============================================================================
// Label Taxonomy
// ============================================================================

/// Label fragment marking observation entities
pub const OBSERVATION_LABEL: &str = "Observation";

/// Label fragment marking anatomy entities
pub const ANATOMY_LABEL: &str = "Anatomy";

/// Certainty qualifier attached to an observation
///
/// Serialized with the human-readable form used in RadGraph labels,
/// e.g. `"definitely absent"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Certainty {
    #[serde(rename = "definitely present")]
    DefinitelyPresent,
    #[serde(rename = "definitely absent")]
    DefinitelyAbsent,
    #[serde(rename = "uncertain")]
    Uncertain,
}

impl Certainty {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DefinitelyPresent => "definitely present",
            Self::DefinitelyAbsent => "definitely absent",
            Self::Uncertain => "uncertain",
        }
    }

    /// Certainty carried by an observation label.
    ///
    /// Only the six tagged observation labels (plain and measurement) are
    /// recognized; anatomy labels and untagged labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Observation::definitely present" | "Observation::measurement::definitely present" => {
                Some(Self::DefinitelyPresent)
            }
            "Observation::definitely absent" | "Observation::measurement::definitely absent" => {
                Some(Self::DefinitelyAbsent)
            }
            "Observation::uncertain" | "Observation::measurement::uncertain" => {
                Some(Self::Uncertain)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Certainty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Relations
// ============================================================================

/// Relation types emitted by the extraction model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationKind {
    /// Source entity modifies the target entity
    Modify,
    /// Observation is located at an anatomy
    LocatedAt,
    /// Observation suggests another observation
    SuggestiveOf,
    /// Any relation type the pipeline does not interpret
    Other(String),
}

impl RelationKind {
    /// Get the wire representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Modify => "modify",
            Self::LocatedAt => "located_at",
            Self::SuggestiveOf => "suggestive_of",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for RelationKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "modify" => Self::Modify,
            "located_at" => Self::LocatedAt,
            "suggestive_of" => Self::SuggestiveOf,
            _ => Self::Other(s),
        }
    }
}

impl From<RelationKind> for String {
    fn from(kind: RelationKind) -> Self {
        match kind {
            RelationKind::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed edge from the owning entity to `target`
///
/// Encoded on the wire as a two-element array: `["located_at", "0"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(RelationKind, String)", into = "(RelationKind, String)")]
pub struct Relation {
    pub kind: RelationKind,
    pub target: String,
}

impl Relation {
    /// Create a new relation
    pub fn new(kind: RelationKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }
}

impl From<(RelationKind, String)> for Relation {
    fn from((kind, target): (RelationKind, String)) -> Self {
        Self { kind, target }
    }
}

impl From<Relation> for (RelationKind, String) {
    fn from(relation: Relation) -> Self {
        (relation.kind, relation.target)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A validated annotation entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Identifier, unique within a document
    pub id: String,

    /// Surface text of the span
    pub tokens: String,

    /// Entity label, e.g. `Observation::definitely present`
    pub label: String,

    /// Token offset where the span starts
    pub start_ix: usize,

    /// Token offset where the span ends (inclusive)
    pub end_ix: usize,

    /// Outgoing relations in model order
    pub relations: Vec<Relation>,
}

impl Entity {
    /// Create an entity without relations
    pub fn new(
        id: impl Into<String>,
        tokens: impl Into<String>,
        label: impl Into<String>,
        start_ix: usize,
        end_ix: usize,
    ) -> Self {
        Self {
            id: id.into(),
            tokens: tokens.into(),
            label: label.into(),
            start_ix,
            end_ix,
            relations: Vec::new(),
        }
    }

    /// Add an outgoing relation
    pub fn with_relation(mut self, kind: RelationKind, target: impl Into<String>) -> Self {
        self.relations.push(Relation::new(kind, target));
        self
    }

    pub fn is_observation(&self) -> bool {
        self.label.contains(OBSERVATION_LABEL)
    }

    pub fn is_anatomy(&self) -> bool {
        self.label.contains(ANATOMY_LABEL)
    }

    /// Whether this entity modifies some other entity
    pub fn is_modifier(&self) -> bool {
        self.relations.iter().any(|r| r.kind == RelationKind::Modify)
    }

    /// An observation that does not itself modify anything
    pub fn is_main_observation(&self) -> bool {
        self.is_observation() && !self.is_modifier()
    }

    pub fn certainty(&self) -> Option<Certainty> {
        Certainty::from_label(&self.label)
    }
}

// ============================================================================
// Output Models
// ============================================================================

/// A normalized clinical observation
///
/// Field order follows the serialized layout consumed downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Observation phrase in reading order, lowercased
    pub observation: String,

    /// Sorted, deduplicated start offsets of the modifier closure
    pub observation_start_ix: Vec<usize>,

    /// Anatomy phrases this observation is located at
    pub located_at: Vec<String>,

    /// Sorted start offsets for each entry of `located_at`
    pub located_at_start_ix: Vec<Vec<usize>>,

    /// Exactly one certainty tag
    pub tags: Vec<Certainty>,

    /// "<observation> suggestive of <target>" phrases, `None` when the
    /// observation has no suggestive_of relation
    pub suggestive_of: Option<Vec<String>>,

    /// Sorted, deduplicated end offsets of the modifier closure
    pub observation_end_ix: Vec<usize>,
}

impl ObservationRecord {
    /// The record's certainty tag
    pub fn tag(&self) -> Option<Certainty> {
        self.tags.first().copied()
    }
}

/// Post-processing output for one annotation input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedAnnotations {
    /// Observation records in discovery order
    pub processed_annotations: Vec<ObservationRecord>,

    /// The input annotations, passed through unchanged
    pub radgraph_annotations: Box<RawValue>,

    /// Stringified start offset to entity label, for every entity
    pub start_ix_to_label: OrderedMap<String>,

    /// Source text of the document
    pub radgraph_text: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certainty_from_label() {
        assert_eq!(
            Certainty::from_label("Observation::definitely absent"),
            Some(Certainty::DefinitelyAbsent)
        );
        assert_eq!(
            Certainty::from_label("Observation::measurement::uncertain"),
            Some(Certainty::Uncertain)
        );
        assert_eq!(Certainty::from_label("Anatomy::definitely present"), None);
        assert_eq!(Certainty::from_label("Observation"), None);
    }

    #[test]
    fn test_certainty_serialization() {
        let json = serde_json::to_string(&vec![Certainty::DefinitelyPresent]).unwrap();
        assert_eq!(json, r#"["definitely present"]"#);
        assert_eq!(Certainty::Uncertain.to_string(), "uncertain");
    }

    #[test]
    fn test_relation_wire_format() {
        let relation: Relation = serde_json::from_str(r#"["located_at", "3"]"#).unwrap();
        assert_eq!(relation.kind, RelationKind::LocatedAt);
        assert_eq!(relation.target, "3");

        let other: Relation = serde_json::from_str(r#"["part_of", "1"]"#).unwrap();
        assert_eq!(other.kind, RelationKind::Other("part_of".to_string()));
        assert_eq!(serde_json::to_string(&other).unwrap(), r#"["part_of","1"]"#);
    }

    #[test]
    fn test_main_observation() {
        let main = Entity::new("1", "effusion", "Observation::definitely present", 3, 3)
            .with_relation(RelationKind::LocatedAt, "0");
        let modifier = Entity::new("2", "small", "Observation::definitely present", 2, 2)
            .with_relation(RelationKind::Modify, "1");
        let anatomy = Entity::new("0", "pleural", "Anatomy::definitely present", 4, 4);

        assert!(main.is_main_observation());
        assert!(!modifier.is_main_observation());
        assert!(!anatomy.is_main_observation());
        assert!(anatomy.is_anatomy());
    }

    #[test]
    fn test_error_display() {
        let err = RadGraphError::DanglingReference {
            entity: "1".to_string(),
            relation: "modify".to_string(),
            target: "9".to_string(),
        };
        assert!(err.to_string().contains("unknown entity 9"));

        let err = RadGraphError::MissingField {
            entity: "4".to_string(),
            field: "label",
        };
        assert!(err.to_string().contains("'label'"));
    }
}
