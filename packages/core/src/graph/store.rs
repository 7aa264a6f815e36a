use super::changes::{EdgeChange, NodeChange};
use super::edge::{Connection, Edge, pick_source_handle, pick_target_handle};
use super::ghost::{GhostEdge, GhostNode, is_ghost_id};
use super::node::{Node, NodeDataPatch, NodePatch};
use crate::history::{UndoEntry, UndoStack};
use crate::persist::PersistScheduler;
use cause_map_types::sync::broadcast;
use std::{collections::HashMap, sync::Arc};

const EVENT_CAPACITY: usize = 64;

/// Notifications emitted after every committed mutation. Observers (the
/// canvas, the attachment collaborator) subscribe and re-read through the
/// accessors; events carry ids, never state.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    GraphChanged,
    GhostsChanged,
    GenerationChanged { node_id: String },
    /// A node left the graph. Attachment cleanup hangs off this.
    NodeRemoved { node_id: String },
    StatusChanged,
}

/// Cloned view of the canonical graph, in stable id order.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Owns the canonical node/edge maps, the ghost preview lists and the global
/// suggestion flags. Every mutation runs to completion while the caller
/// holds the store, so observers never see a half-applied edit.
pub struct GraphStore {
    nodes: HashMap<String, Node>,
    edges: HashMap<String, Edge>,
    ghost_nodes: HashMap<String, GhostNode>,
    ghost_edges: HashMap<String, GhostEdge>,
    is_generating: bool,
    ai_error: Option<String>,
    pub(crate) history: UndoStack,
    events: broadcast::Sender<StoreEvent>,
    persist: Option<Arc<PersistScheduler>>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            ghost_nodes: HashMap::new(),
            ghost_edges: HashMap::new(),
            is_generating: false,
            ai_error: None,
            history: UndoStack::default(),
            events,
            persist: None,
        }
    }

    pub fn set_scheduler(&mut self, scheduler: Arc<PersistScheduler>) {
        self.persist = Some(scheduler);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub(crate) fn notify(&self, event: StoreEvent) {
        // No receivers is fine; nothing observes a headless store.
        let _ = self.events.send(event);
    }

    pub(crate) fn schedule_persist(&self) {
        if let Some(scheduler) = &self.persist {
            scheduler.schedule(self.snapshot());
        }
    }

    // Accessors

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Removes one ghost and its preview edges, leaving siblings intact.
    pub(crate) fn take_ghost(&mut self, id: &str) -> Option<GhostNode> {
        let ghost = self.ghost_nodes.remove(id)?;
        self.ghost_edges
            .retain(|_, edge| edge.source != id && edge.target != id);
        Some(ghost)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn ghost_node(&self, id: &str) -> Option<&GhostNode> {
        self.ghost_nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn ghost_count(&self) -> usize {
        self.ghost_nodes.len()
    }

    pub fn ghost_edge_count(&self) -> usize {
        self.ghost_edges.len()
    }

    pub fn is_generating(&self) -> bool {
        self.is_generating
    }

    pub fn ai_error(&self) -> Option<&str> {
        self.ai_error.as_deref()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn ghost_nodes(&self) -> impl Iterator<Item = &GhostNode> {
        self.ghost_nodes.values()
    }

    pub fn ghost_edges(&self) -> impl Iterator<Item = &GhostEdge> {
        self.ghost_edges.values()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let mut nodes: Vec<Node> = self.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut edges: Vec<Edge> = self.edges.values().cloned().collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        GraphSnapshot { nodes, edges }
    }

    // Canonical mutations

    pub fn add_node(&mut self, node: Node) {
        self.history.record(UndoEntry::NodeAdded {
            id: node.id.clone(),
        });
        self.nodes.insert(node.id.clone(), node);
        self.notify(StoreEvent::GraphChanged);
        self.schedule_persist();
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.history.record(UndoEntry::EdgeAdded {
            id: edge.id.clone(),
        });
        self.edges.insert(edge.id.clone(), edge);
        self.notify(StoreEvent::GraphChanged);
        self.schedule_persist();
    }

    /// Appends an edge, auto-assigning any handle the caller omitted to the
    /// least-used member of the fixed handle set.
    pub fn connect(&mut self, connection: Connection) -> String {
        let source_handle = connection
            .source_handle
            .unwrap_or_else(|| pick_source_handle(self.edges.values(), &connection.source));
        let target_handle = connection
            .target_handle
            .unwrap_or_else(|| pick_target_handle(self.edges.values(), &connection.target));

        let mut edge = Edge::new(connection.source, connection.target);
        edge.source_handle = Some(source_handle);
        edge.target_handle = Some(target_handle);
        let edge_id = edge.id.clone();
        self.add_edge(edge);
        edge_id
    }

    pub fn update_node(&mut self, id: &str, patch: NodePatch) {
        if let Some(node) = self.nodes.get_mut(id) {
            patch.apply(node);
            self.notify(StoreEvent::GraphChanged);
            self.schedule_persist();
        }
    }

    pub fn update_node_data(&mut self, id: &str, patch: NodeDataPatch) {
        if let Some(node) = self.nodes.get_mut(id) {
            patch.apply(&mut node.data);
            self.notify(StoreEvent::GraphChanged);
            self.schedule_persist();
        }
    }

    /// Removes the node and every edge touching it as one logical edit.
    /// Deleting an absent id is an idempotent no-op.
    pub fn delete_node(&mut self, id: &str) {
        let Some(node) = self.nodes.remove(id) else {
            return;
        };
        let removed_ids: Vec<String> = self
            .edges
            .values()
            .filter(|edge| edge.touches(id))
            .map(|edge| edge.id.clone())
            .collect();
        let mut removed_edges = Vec::with_capacity(removed_ids.len());
        for edge_id in removed_ids {
            if let Some(edge) = self.edges.remove(&edge_id) {
                removed_edges.push(edge);
            }
        }
        self.history.record_node_removed(node, removed_edges);
        self.notify(StoreEvent::NodeRemoved {
            node_id: id.to_string(),
        });
        self.notify(StoreEvent::GraphChanged);
        self.schedule_persist();
    }

    pub fn delete_edge(&mut self, id: &str) {
        if let Some(edge) = self.edges.remove(id) {
            self.history.record_edge_removed(edge);
            self.notify(StoreEvent::GraphChanged);
            self.schedule_persist();
        }
    }

    // Bulk change application; one API over both universes.

    pub fn apply_node_changes(&mut self, changes: Vec<NodeChange>) {
        let mut canonical_moved = false;
        let mut ghosts_moved = false;

        for change in changes {
            match change {
                NodeChange::Position { id, position } => {
                    if is_ghost_id(&id) {
                        if let Some(ghost) = self.ghost_nodes.get_mut(&id) {
                            ghost.position = position;
                            ghosts_moved = true;
                        }
                    } else if let Some(node) = self.nodes.get_mut(&id) {
                        node.position = position;
                        canonical_moved = true;
                    }
                }
                NodeChange::Dimensions { id, width, height } => {
                    // Ghosts render at a fixed preview size.
                    if !is_ghost_id(&id) {
                        if let Some(node) = self.nodes.get_mut(&id) {
                            node.width = Some(width);
                            node.height = Some(height);
                            canonical_moved = true;
                        }
                    }
                }
                NodeChange::Remove { id } => {
                    if is_ghost_id(&id) {
                        self.dismiss_ghost_node(&id);
                    } else {
                        self.delete_node(&id);
                    }
                }
            }
        }

        if canonical_moved {
            self.notify(StoreEvent::GraphChanged);
            self.schedule_persist();
        }
        if ghosts_moved {
            self.notify(StoreEvent::GhostsChanged);
        }
    }

    pub fn apply_edge_changes(&mut self, changes: Vec<EdgeChange>) {
        for change in changes {
            match change {
                EdgeChange::Remove { id } => {
                    if is_ghost_id(&id) {
                        if self.ghost_edges.remove(&id).is_some() {
                            self.notify(StoreEvent::GhostsChanged);
                        }
                    } else {
                        self.delete_edge(&id);
                    }
                }
            }
        }
    }

    // Ghost previews

    /// Atomically replaces the preview set. Ghosts are never persisted.
    pub fn set_ghost_suggestions(&mut self, nodes: Vec<GhostNode>, edges: Vec<GhostEdge>) {
        self.ghost_nodes = nodes
            .into_iter()
            .map(|ghost| (ghost.id.clone(), ghost))
            .collect();
        self.ghost_edges = edges
            .into_iter()
            .map(|ghost| (ghost.id.clone(), ghost))
            .collect();
        self.notify(StoreEvent::GhostsChanged);
    }

    pub fn dismiss_ghost_node(&mut self, id: &str) {
        if self.ghost_nodes.remove(id).is_none() {
            return;
        }
        self.ghost_edges
            .retain(|_, edge| edge.source != id && edge.target != id);
        self.notify(StoreEvent::GhostsChanged);
    }

    pub fn dismiss_all_ghost_nodes(&mut self) {
        if self.ghost_nodes.is_empty() && self.ghost_edges.is_empty() {
            return;
        }
        self.ghost_nodes.clear();
        self.ghost_edges.clear();
        self.notify(StoreEvent::GhostsChanged);
    }

    // Global suggestion flags

    pub fn set_generating(&mut self, generating: bool) {
        self.is_generating = generating;
        self.notify(StoreEvent::StatusChanged);
    }

    pub fn set_ai_error(&mut self, error: Option<String>) {
        self.ai_error = error;
        self.notify(StoreEvent::StatusChanged);
    }

    // Undo

    /// Pops the most recent structural edit and applies its inverse, with
    /// recording suppressed so undo is not itself undoable.
    pub fn undo_last_action(&mut self) {
        let Some(entry) = self.history.pop() else {
            return;
        };
        match entry {
            UndoEntry::NodeAdded { id } => {
                self.nodes.remove(&id);
                // Keep referential integrity: edges added against the node
                // cannot outlive it.
                self.edges.retain(|_, edge| !edge.touches(&id));
            }
            UndoEntry::EdgeAdded { id } => {
                self.edges.remove(&id);
            }
            UndoEntry::EdgeRemoved { edge } => {
                if self.nodes.contains_key(&edge.source) && self.nodes.contains_key(&edge.target) {
                    self.edges.insert(edge.id.clone(), edge);
                }
            }
            UndoEntry::NodeRemoved { node, edges } => {
                self.nodes.insert(node.id.clone(), node);
                for edge in edges {
                    if self.nodes.contains_key(&edge.source)
                        && self.nodes.contains_key(&edge.target)
                    {
                        self.edges.insert(edge.id.clone(), edge);
                    }
                }
            }
        }
        self.notify(StoreEvent::GraphChanged);
        self.schedule_persist();
    }

    // Startup

    /// Installs the persisted graph as canonical state. Clears history and
    /// does not schedule a write-back of what was just read.
    pub fn load(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.nodes = nodes.into_iter().map(|node| (node.id.clone(), node)).collect();
        self.edges = edges.into_iter().map(|edge| (edge.id.clone(), edge)).collect();
        self.history.clear();
        self.notify(StoreEvent::GraphChanged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ghost::PlannedDirection;
    use crate::graph::node::{NodeKind, Position};

    fn observation(text: &str) -> Node {
        Node::with_text(NodeKind::Observation, Position::default(), text)
    }

    fn direction(source: &str) -> PlannedDirection {
        PlannedDirection {
            id: cause_map_types::create_id(),
            summary_title: "Possible mechanism".to_string(),
            suggested_kind: NodeKind::Mechanism,
            search_query: "mechanism pathway".to_string(),
            source_node_id: source.to_string(),
        }
    }

    fn ghost(parent: &str) -> GhostNode {
        GhostNode::new(parent, Position::new(300.0, 0.0), direction(parent))
    }

    #[test]
    fn mutations_on_absent_ids_are_no_ops() {
        let mut store = GraphStore::new();
        store.update_node("missing", NodePatch::default());
        store.update_node_data("missing", NodeDataPatch::default());
        store.delete_node("missing");
        store.delete_edge("missing");
        assert_eq!(store.node_count(), 0);
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn delete_node_cascades_incident_edges() {
        let mut store = GraphStore::new();
        let a = observation("a");
        let b = observation("b");
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        store.add_node(a);
        store.add_node(b);
        store.connect(Connection {
            source: a_id.clone(),
            target: b_id.clone(),
            ..Default::default()
        });

        store.delete_node(&b_id);
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.edge_count(), 0);
        assert!(store.node(&a_id).is_some());
    }

    #[test]
    fn delete_node_emits_removal_event_for_attachment_cleanup() {
        let mut store = GraphStore::new();
        let node = observation("a");
        let id = node.id.clone();
        let mut events = store.subscribe();
        store.add_node(node);
        store.delete_node(&id);

        let mut saw_removal = false;
        while let Ok(event) = events.try_recv() {
            if event == (StoreEvent::NodeRemoved { node_id: id.clone() }) {
                saw_removal = true;
            }
        }
        assert!(saw_removal);
    }

    #[test]
    fn connect_spreads_handles_across_the_fixed_set() {
        let mut store = GraphStore::new();
        let root = observation("root");
        let root_id = root.id.clone();
        store.add_node(root);

        let mut handles = Vec::new();
        for text in ["x", "y", "z"] {
            let child = observation(text);
            let child_id = child.id.clone();
            store.add_node(child);
            let edge_id = store.connect(Connection {
                source: root_id.clone(),
                target: child_id,
                ..Default::default()
            });
            let edge = store.edge(&edge_id).expect("edge");
            handles.push(edge.source_handle.clone().expect("handle"));
        }
        handles.sort();
        handles.dedup();
        assert_eq!(handles.len(), 3);
    }

    #[test]
    fn connect_respects_caller_supplied_handles() {
        let mut store = GraphStore::new();
        let a = observation("a");
        let b = observation("b");
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        store.add_node(a);
        store.add_node(b);

        let edge_id = store.connect(Connection {
            source: a_id,
            target: b_id,
            source_handle: Some("source-bottom".to_string()),
            target_handle: None,
        });
        let edge = store.edge(&edge_id).expect("edge");
        assert_eq!(edge.source_handle.as_deref(), Some("source-bottom"));
        assert!(edge.target_handle.is_some());
    }

    #[test]
    fn bulk_changes_route_ghost_ids_to_the_preview_lists() {
        let mut store = GraphStore::new();
        let node = observation("real");
        let node_id = node.id.clone();
        store.add_node(node);

        let ghost = ghost(&node_id);
        let ghost_id = ghost.id.clone();
        let ghost_edge = GhostEdge::new(node_id.clone(), ghost_id.clone());
        store.set_ghost_suggestions(vec![ghost], vec![ghost_edge]);

        store.apply_node_changes(vec![NodeChange::Position {
            id: ghost_id.clone(),
            position: Position::new(500.0, 40.0),
        }]);
        assert_eq!(
            store.ghost_node(&ghost_id).expect("ghost").position,
            Position::new(500.0, 40.0)
        );
        // The canonical node is untouched.
        assert_eq!(
            store.node(&node_id).expect("node").position,
            Position::default()
        );

        store.apply_node_changes(vec![NodeChange::Remove {
            id: ghost_id.clone(),
        }]);
        assert_eq!(store.ghost_count(), 0);
        assert_eq!(store.ghost_edge_count(), 0);
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn set_ghost_suggestions_replaces_the_previous_preview() {
        let mut store = GraphStore::new();
        let node = observation("real");
        let node_id = node.id.clone();
        store.add_node(node);

        store.set_ghost_suggestions(vec![ghost(&node_id), ghost(&node_id)], vec![]);
        assert_eq!(store.ghost_count(), 2);

        store.set_ghost_suggestions(vec![ghost(&node_id)], vec![]);
        assert_eq!(store.ghost_count(), 1);

        store.dismiss_all_ghost_nodes();
        assert_eq!(store.ghost_count(), 0);
    }

    #[test]
    fn snapshot_is_in_stable_id_order() {
        let mut store = GraphStore::new();
        for text in ["one", "two", "three"] {
            store.add_node(observation(text));
        }
        let first = store.snapshot();
        let second = store.snapshot();
        let ids: Vec<&str> = first.nodes.iter().map(|n| n.id.as_str()).collect();
        let ids_again: Vec<&str> = second.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ids_again);
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn load_replaces_state_without_recording_history() {
        let mut store = GraphStore::new();
        store.add_node(observation("pre-existing"));

        let a = observation("a");
        let b = observation("b");
        let edge = Edge::new(a.id.clone(), b.id.clone());
        store.load(vec![a, b], vec![edge]);

        assert_eq!(store.node_count(), 2);
        assert_eq!(store.edge_count(), 1);
        // Nothing to undo after a load.
        store.undo_last_action();
        assert_eq!(store.node_count(), 2);
    }
}
