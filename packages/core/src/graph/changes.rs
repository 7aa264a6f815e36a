use super::node::Position;
use cause_map_types::JsonSchema;
use serde::{Deserialize, Serialize};

/// Positional/dimension/removal diffs delivered in bulk from the canvas.
/// Ids with the ghost prefix are routed to the preview lists.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeChange {
    Position { id: String, position: Position },
    Dimensions { id: String, width: f32, height: f32 },
    Remove { id: String },
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EdgeChange {
    Remove { id: String },
}
