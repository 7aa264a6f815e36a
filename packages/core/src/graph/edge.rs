use cause_map_types::{JsonSchema, create_id};
use serde::{Deserialize, Serialize};

/// Fixed handle sets per node side. Auto-assignment spreads connections over
/// these so parallel edges do not stack on one anchor; this is a visual aid,
/// not a correctness invariant.
pub const SOURCE_HANDLES: [&str; 3] = ["source-top", "source-middle", "source-bottom"];
pub const TARGET_HANDLES: [&str; 3] = ["target-top", "target-middle", "target-bottom"];

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: create_id(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Caller intent for `GraphStore::connect`. Omitted handles are auto-assigned
/// to the least-used member of the fixed handle set.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

fn least_used<'a>(
    handles: &'static [&'static str],
    assigned: impl Iterator<Item = &'a str>,
) -> String {
    let mut counts = vec![0usize; handles.len()];
    for handle in assigned {
        if let Some(slot) = handles.iter().position(|h| *h == handle) {
            counts[slot] += 1;
        }
    }
    // Ties resolve to the first handle in declaration order.
    let slot = (0..handles.len())
        .min_by_key(|slot| counts[*slot])
        .unwrap_or(0);
    handles[slot].to_string()
}

pub(crate) fn pick_source_handle<'a>(
    edges: impl Iterator<Item = &'a Edge>,
    node_id: &str,
) -> String {
    least_used(
        &SOURCE_HANDLES,
        edges
            .filter(|edge| edge.source == node_id)
            .filter_map(|edge| edge.source_handle.as_deref()),
    )
}

pub(crate) fn pick_target_handle<'a>(
    edges: impl Iterator<Item = &'a Edge>,
    node_id: &str,
) -> String {
    least_used(
        &TARGET_HANDLES,
        edges
            .filter(|edge| edge.target == node_id)
            .filter_map(|edge| edge.target_handle.as_deref()),
    )
}
