use crate::graph::{Edge, Node};

/// Inverse record for one structural edit. A node removal and the edges it
/// was connected to form a single entry, so one undo restores both.
#[derive(Debug, Clone)]
pub enum UndoEntry {
    NodeAdded { id: String },
    EdgeAdded { id: String },
    EdgeRemoved { edge: Edge },
    NodeRemoved { node: Node, edges: Vec<Edge> },
}

/// Only the most recent entry is contractually correct to replay; deeper
/// history is kept because it costs nothing.
#[derive(Debug, Default)]
pub struct UndoStack {
    entries: Vec<UndoEntry>,
}

impl UndoStack {
    pub fn record(&mut self, entry: UndoEntry) {
        self.entries.push(entry);
    }

    /// An edge removal observed right after the removal of one of its
    /// endpoints folds into that node's bundle instead of standing alone.
    pub fn record_edge_removed(&mut self, edge: Edge) {
        if let Some(UndoEntry::NodeRemoved { node, edges }) = self.entries.last_mut() {
            if edge.touches(&node.id) {
                if !edges.iter().any(|existing| existing.id == edge.id) {
                    edges.push(edge);
                }
                return;
            }
        }
        self.entries.push(UndoEntry::EdgeRemoved { edge });
    }

    /// A node removal drains trailing edge-removal entries that referenced
    /// the node into its bundle, covering the edge-first observation order.
    pub fn record_node_removed(&mut self, node: Node, mut edges: Vec<Edge>) {
        loop {
            let bundle = matches!(
                self.entries.last(),
                Some(UndoEntry::EdgeRemoved { edge }) if edge.touches(&node.id)
            );
            if !bundle {
                break;
            }
            if let Some(UndoEntry::EdgeRemoved { edge }) = self.entries.pop() {
                if !edges.iter().any(|existing| existing.id == edge.id) {
                    edges.push(edge);
                }
            }
        }
        self.entries.push(UndoEntry::NodeRemoved { node, edges });
    }

    pub fn pop(&mut self) -> Option<UndoEntry> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
