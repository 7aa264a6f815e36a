use cause_map_types::{GenerationError, JsonSchema, create_id};
use serde::{Deserialize, Serialize};

pub const GRADE_MIN: u8 = 1;
pub const GRADE_MAX: u8 = 5;

/// The three step kinds of a causal-reasoning diagram.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Observation,
    Mechanism,
    Validation,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Observation => "observation",
            NodeKind::Mechanism => "mechanism",
            NodeKind::Validation => "validation",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw {
            "observation" => Some(NodeKind::Observation),
            "mechanism" => Some(NodeKind::Mechanism),
            "validation" => Some(NodeKind::Validation),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub index: u32,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Lifecycle of a node created from an accepted suggestion. A node that
/// carries no tracker is an ordinary settled node; the tracker is only ever
/// mutated through the transitions in `graph::lifecycle`.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Generation {
    Pending,
    Complete,
    Error { error: GenerationError },
}

impl Generation {
    pub fn is_pending(&self) -> bool {
        matches!(self, Generation::Pending)
    }

    pub fn error(&self) -> Option<&GenerationError> {
        match self {
            Generation::Error { error } => Some(error),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq, Default)]
pub struct NodeData {
    #[serde(default)]
    pub text_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<Generation>,
    /// Ghost this node was created from, retained for traceability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ghost_id: Option<String>,
}

impl NodeData {
    pub fn set_grade(&mut self, grade: u8) {
        self.grade = Some(grade.clamp(GRADE_MIN, GRADE_MAX));
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default)]
    pub data: NodeData,
}

impl Node {
    pub fn new(kind: NodeKind, position: Position) -> Self {
        Self {
            id: create_id(),
            kind,
            position,
            width: None,
            height: None,
            data: NodeData::default(),
        }
    }

    pub fn with_text(kind: NodeKind, position: Position, text_content: impl Into<String>) -> Self {
        let mut node = Self::new(kind, position);
        node.data.text_content = text_content.into();
        node
    }
}

/// Shallow merge into a node's top-level fields. `None` leaves the field
/// untouched.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default)]
pub struct NodePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

impl NodePatch {
    pub fn apply(self, node: &mut Node) {
        if let Some(position) = self.position {
            node.position = position;
        }
        if let Some(width) = self.width {
            node.width = Some(width);
        }
        if let Some(height) = self.height {
            node.height = Some(height);
        }
    }
}

/// Shallow merge into a node's `data`. The generation tracker and ghost
/// provenance are deliberately absent: those only move through the lifecycle
/// transitions.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default)]
pub struct NodeDataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<u8>,
}

impl NodeDataPatch {
    pub fn apply(self, data: &mut NodeData) {
        if let Some(text_content) = self.text_content {
            data.text_content = text_content;
        }
        if let Some(summary_title) = self.summary_title {
            data.summary_title = Some(summary_title);
        }
        if let Some(citations) = self.citations {
            data.citations = citations;
        }
        if let Some(grade) = self.grade {
            data.set_grade(grade);
        }
    }
}
