pub mod changes;
pub mod edge;
pub mod ghost;
pub mod lifecycle;
pub mod node;
pub mod store;

pub use changes::{EdgeChange, NodeChange};
pub use edge::{Connection, Edge};
pub use ghost::{GHOST_PREFIX, GhostEdge, GhostNode, PlannedDirection, is_ghost_id};
pub use lifecycle::StepContent;
pub use node::{
    Citation, Generation, Node, NodeData, NodeDataPatch, NodeKind, NodePatch, Position,
};
pub use store::{GraphSnapshot, GraphStore, StoreEvent};
