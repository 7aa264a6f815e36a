use crate::graph::{Edge, GraphSnapshot, Node};
use cause_map_storage::{EdgeRecord, NodeRecord, ProjectStore};
use cause_map_types::{Result, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const PERSIST_DEBOUNCE_MS: u64 = 500;

#[derive(Default)]
struct PendingState {
    snapshot: Option<GraphSnapshot>,
    /// Bumped on every schedule/flush/cancel; a sleeping debounce task that
    /// wakes up with a stale epoch walks away without writing.
    epoch: u64,
}

struct Inner {
    store: Arc<ProjectStore>,
    delay: Duration,
    pending: Mutex<PendingState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, PendingState> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    async fn write(&self, snapshot: GraphSnapshot) {
        let (nodes, edges) = to_records(&snapshot);
        if let Err(err) = self.store.persist(&nodes, &edges).await {
            tracing::error!(error = %err, "failed to persist graph snapshot");
        }
    }
}

/// Debounces and batches full-snapshot writes: bursts of rapid mutations
/// collapse into one overwrite after the debounce window. Owns all of its
/// timer state; requires a tokio runtime.
pub struct PersistScheduler {
    inner: Arc<Inner>,
}

impl PersistScheduler {
    pub fn new(store: Arc<ProjectStore>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                delay,
                pending: Mutex::new(PendingState::default()),
            }),
        }
    }

    /// Replaces any pending snapshot and re-arms the debounce window.
    pub fn schedule(&self, snapshot: GraphSnapshot) {
        let epoch = {
            let mut pending = self.inner.lock();
            pending.snapshot = Some(snapshot);
            pending.epoch += 1;
            pending.epoch
        };
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            let snapshot = {
                let mut pending = inner.lock();
                if pending.epoch != epoch {
                    return;
                }
                pending.snapshot.take()
            };
            if let Some(snapshot) = snapshot {
                inner.write(snapshot).await;
            }
        });
    }

    /// Writes the pending snapshot immediately, skipping the debounce.
    pub async fn flush(&self) {
        let snapshot = {
            let mut pending = self.inner.lock();
            pending.epoch += 1;
            pending.snapshot.take()
        };
        if let Some(snapshot) = snapshot {
            self.inner.write(snapshot).await;
        }
    }

    /// Drops the pending snapshot without writing it.
    pub fn cancel(&self) {
        let mut pending = self.inner.lock();
        pending.epoch += 1;
        pending.snapshot = None;
    }
}

/// Derives the durable form of a snapshot. `parent_ids` is computed here,
/// from the edges whose target is the node; the in-memory node never carries
/// it.
pub fn to_records(snapshot: &GraphSnapshot) -> (Vec<NodeRecord>, Vec<EdgeRecord>) {
    let mut parents: HashMap<&str, Vec<String>> = HashMap::new();
    for edge in &snapshot.edges {
        parents
            .entry(edge.target.as_str())
            .or_default()
            .push(edge.source.clone());
    }

    let nodes = snapshot
        .nodes
        .iter()
        .map(|node| NodeRecord {
            id: node.id.clone(),
            kind: node.kind.as_str().to_string(),
            x: node.position.x,
            y: node.position.y,
            data: json::to_value(&node.data).unwrap_or(json::Value::Null),
            parent_ids: parents.remove(node.id.as_str()).unwrap_or_default(),
        })
        .collect();

    let edges = snapshot
        .edges
        .iter()
        .map(|edge| EdgeRecord {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            source_handle: edge.source_handle.clone(),
            target_handle: edge.target_handle.clone(),
        })
        .collect();

    (nodes, edges)
}

/// Inverse of `to_records`, used by the startup load. Records with an
/// unknown kind or malformed data are skipped rather than failing the load.
pub fn from_records(nodes: Vec<NodeRecord>, edges: Vec<EdgeRecord>) -> Result<(Vec<Node>, Vec<Edge>)> {
    let mut loaded_nodes = Vec::with_capacity(nodes.len());
    for record in nodes {
        let Some(kind) = crate::graph::NodeKind::from_str(&record.kind) else {
            tracing::warn!(id = %record.id, kind = %record.kind, "skipping unknown node kind");
            continue;
        };
        let data = match json::from_value(record.data) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(id = %record.id, error = %err, "skipping malformed node data");
                continue;
            }
        };
        loaded_nodes.push(Node {
            id: record.id,
            kind,
            position: crate::graph::Position::new(record.x, record.y),
            width: None,
            height: None,
            data,
        });
    }

    let loaded_edges = edges
        .into_iter()
        .map(|record| Edge {
            id: record.id,
            source: record.source,
            target: record.target,
            source_handle: record.source_handle,
            target_handle: record.target_handle,
        })
        .collect();

    Ok((loaded_nodes, loaded_edges))
}
