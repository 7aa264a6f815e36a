use super::node::{NodeKind, Position};
use cause_map_types::{JsonSchema, create_id};
use serde::{Deserialize, Serialize};

/// Ghost ids carry this prefix so bulk change application can route them to
/// the preview lists without consulting the canonical graph.
pub const GHOST_PREFIX: &str = "ghost-";

pub fn is_ghost_id(id: &str) -> bool {
    id.starts_with(GHOST_PREFIX)
}

/// Lightweight descriptor produced by the planning phase and reused verbatim
/// to drive full generation after accept.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlannedDirection {
    pub id: String,
    pub summary_title: String,
    pub suggested_kind: NodeKind,
    pub search_query: String,
    pub source_node_id: String,
}

/// Ephemeral preview of a possible next step. Never persisted; lives only
/// between planning and accept/dismiss.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GhostNode {
    pub id: String,
    pub parent_id: String,
    pub position: Position,
    pub direction: PlannedDirection,
}

impl GhostNode {
    pub fn new(parent_id: impl Into<String>, position: Position, direction: PlannedDirection) -> Self {
        Self {
            id: format!("{GHOST_PREFIX}{}", create_id()),
            parent_id: parent_id.into(),
            position,
            direction,
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GhostEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl GhostEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: format!("{GHOST_PREFIX}{}", create_id()),
            source: source.into(),
            target: target.into(),
        }
    }
}
