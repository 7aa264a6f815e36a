use super::edge::Connection;
use super::node::{Citation, Generation, Node};
use super::store::{GraphStore, StoreEvent};
use cause_map_types::GenerationError;

/// Payload applied to a pending node when its generation succeeds.
#[derive(Debug, Clone, Default)]
pub struct StepContent {
    pub text_content: String,
    pub summary_title: Option<String>,
    pub citations: Vec<Citation>,
}

enum Settle {
    Complete(StepContent),
    Failed(GenerationError),
}

impl GraphStore {
    /// Converts an accepted ghost into a committed pending node wired to its
    /// parent. Converting removes the ghost, so a second call with the same
    /// id finds nothing and returns `None` — the duplicate-accept guard.
    /// Sibling ghosts are left intact.
    pub fn create_pending_node_from_ghost(&mut self, ghost_id: &str) -> Option<String> {
        let ghost = self.take_ghost(ghost_id)?;

        let mut node = Node::new(ghost.direction.suggested_kind, ghost.position);
        node.data.summary_title = Some(ghost.direction.summary_title.clone());
        node.data.generation = Some(Generation::Pending);
        node.data.source_ghost_id = Some(ghost.id.clone());
        let node_id = node.id.clone();

        self.add_node(node);
        self.connect(Connection {
            source: ghost.parent_id,
            target: node_id.clone(),
            ..Default::default()
        });
        self.notify(StoreEvent::GhostsChanged);
        self.notify(StoreEvent::GenerationChanged {
            node_id: node_id.clone(),
        });
        Some(node_id)
    }

    /// Applies a successful generation result. Only takes effect while the
    /// node is `Pending`; a stale completion for a node that already settled
    /// is silently dropped.
    pub fn hydrate_pending_node(&mut self, node_id: &str, content: StepContent) -> bool {
        self.settle(node_id, Settle::Complete(content))
    }

    /// Symmetric to hydrate: records the failure only while `Pending`.
    pub fn mark_pending_node_error(&mut self, node_id: &str, error: GenerationError) -> bool {
        self.settle(node_id, Settle::Failed(error))
    }

    /// Flips an errored node back to `Pending` in place. Returns `false`
    /// when the node is not in error, or its error is not retryable.
    pub fn retry_pending_node_generation(&mut self, node_id: &str) -> bool {
        let Some(node) = self.node_mut(node_id) else {
            return false;
        };
        let retryable = matches!(
            &node.data.generation,
            Some(Generation::Error { error }) if error.retryable
        );
        if !retryable {
            return false;
        }
        node.data.generation = Some(Generation::Pending);
        self.notify(StoreEvent::GenerationChanged {
            node_id: node_id.to_string(),
        });
        self.schedule_persist();
        true
    }

    /// The single transition out of `Pending`. Both the success and the
    /// failure path pass through this guard, which is what makes terminal
    /// states sticky under out-of-order completions.
    fn settle(&mut self, node_id: &str, outcome: Settle) -> bool {
        let Some(node) = self.node_mut(node_id) else {
            return false;
        };
        if !matches!(node.data.generation, Some(Generation::Pending)) {
            tracing::debug!(node_id, "dropping stale generation signal");
            return false;
        }
        match outcome {
            Settle::Complete(content) => {
                node.data.text_content = content.text_content;
                if let Some(summary_title) = content.summary_title {
                    node.data.summary_title = Some(summary_title);
                }
                node.data.citations = content.citations;
                node.data.generation = Some(Generation::Complete);
            }
            Settle::Failed(error) => {
                node.data.generation = Some(Generation::Error { error });
            }
        }
        self.notify(StoreEvent::GenerationChanged {
            node_id: node_id.to_string(),
        });
        self.schedule_persist();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ghost::{GhostEdge, GhostNode, PlannedDirection};
    use crate::graph::node::{NodeKind, Position};
    use cause_map_types::ErrorCode;

    fn store_with_ghosts(count: usize) -> (GraphStore, String, Vec<String>) {
        let mut store = GraphStore::new();
        let root = Node::with_text(NodeKind::Observation, Position::default(), "root");
        let root_id = root.id.clone();
        store.add_node(root);

        let mut ghosts = Vec::new();
        let mut ghost_edges = Vec::new();
        for slot in 0..count {
            let direction = PlannedDirection {
                id: cause_map_types::create_id(),
                summary_title: format!("Direction {slot}"),
                suggested_kind: NodeKind::Mechanism,
                search_query: format!("query {slot}"),
                source_node_id: root_id.clone(),
            };
            let ghost = GhostNode::new(
                root_id.clone(),
                Position::new(320.0, slot as f32 * 150.0),
                direction,
            );
            ghost_edges.push(GhostEdge::new(root_id.clone(), ghost.id.clone()));
            ghosts.push(ghost);
        }
        let ghost_ids: Vec<String> = ghosts.iter().map(|g| g.id.clone()).collect();
        store.set_ghost_suggestions(ghosts, ghost_edges);
        (store, root_id, ghost_ids)
    }

    fn rate_limit_error() -> GenerationError {
        GenerationError::new("openai", ErrorCode::RateLimit, "Too Many Requests")
    }

    fn auth_error() -> GenerationError {
        GenerationError::new("openai", ErrorCode::Auth, "invalid api key")
    }

    fn content(text: &str) -> StepContent {
        StepContent {
            text_content: text.to_string(),
            summary_title: None,
            citations: Vec::new(),
        }
    }

    #[test]
    fn accepting_the_same_ghost_twice_converts_once() {
        let (mut store, root_id, ghost_ids) = store_with_ghosts(1);
        let ghost_id = &ghost_ids[0];

        let first = store.create_pending_node_from_ghost(ghost_id);
        let node_id = first.expect("first accept converts");
        let second = store.create_pending_node_from_ghost(ghost_id);
        assert!(second.is_none());

        let tracked: Vec<&Node> = store
            .nodes()
            .filter(|node| node.data.source_ghost_id.as_deref() == Some(ghost_id.as_str()))
            .collect();
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].id, node_id);
        // Node count: root + one converted pending node.
        assert_eq!(store.node_count(), 2);
        // The parent edge was connected.
        assert!(store.edges().any(|e| e.source == root_id && e.target == node_id));
    }

    #[test]
    fn accepting_one_ghost_leaves_siblings_intact() {
        let (mut store, _, ghost_ids) = store_with_ghosts(3);
        store
            .create_pending_node_from_ghost(&ghost_ids[0])
            .expect("convert");
        assert_eq!(store.ghost_count(), 2);
        assert_eq!(store.ghost_edge_count(), 2);
        assert!(store.ghost_node(&ghost_ids[1]).is_some());
        assert!(store.ghost_node(&ghost_ids[2]).is_some());
    }

    #[test]
    fn stale_error_after_hydration_is_dropped() {
        let (mut store, _, ghost_ids) = store_with_ghosts(1);
        let node_id = store
            .create_pending_node_from_ghost(&ghost_ids[0])
            .expect("convert");

        assert!(store.hydrate_pending_node(&node_id, content("generated step")));
        assert!(!store.mark_pending_node_error(&node_id, rate_limit_error()));

        let node = store.node(&node_id).expect("node");
        assert_eq!(node.data.generation, Some(Generation::Complete));
        assert_eq!(node.data.text_content, "generated step");
    }

    #[test]
    fn stale_hydration_after_error_is_dropped() {
        let (mut store, _, ghost_ids) = store_with_ghosts(1);
        let node_id = store
            .create_pending_node_from_ghost(&ghost_ids[0])
            .expect("convert");

        let error = rate_limit_error();
        assert!(store.mark_pending_node_error(&node_id, error.clone()));
        assert!(!store.hydrate_pending_node(&node_id, content("late arrival")));

        let node = store.node(&node_id).expect("node");
        assert_eq!(
            node.data.generation.as_ref().and_then(Generation::error),
            Some(&error)
        );
        assert_eq!(node.data.text_content, "");
    }

    #[test]
    fn retry_flips_a_retryable_error_back_to_pending_in_place() {
        let (mut store, _, ghost_ids) = store_with_ghosts(1);
        let node_id = store
            .create_pending_node_from_ghost(&ghost_ids[0])
            .expect("convert");
        store.mark_pending_node_error(&node_id, rate_limit_error());
        let nodes_before = store.node_count();

        assert!(store.retry_pending_node_generation(&node_id));

        let node = store.node(&node_id).expect("node");
        assert_eq!(node.data.generation, Some(Generation::Pending));
        assert_eq!(store.node_count(), nodes_before);
        assert_eq!(node.id, node_id);
    }

    #[test]
    fn retry_refuses_non_retryable_errors() {
        let (mut store, _, ghost_ids) = store_with_ghosts(1);
        let node_id = store
            .create_pending_node_from_ghost(&ghost_ids[0])
            .expect("convert");
        let error = auth_error();
        store.mark_pending_node_error(&node_id, error.clone());

        assert!(!store.retry_pending_node_generation(&node_id));
        let node = store.node(&node_id).expect("node");
        assert_eq!(
            node.data.generation.as_ref().and_then(Generation::error),
            Some(&error)
        );
    }

    #[test]
    fn retry_refuses_nodes_that_are_not_in_error() {
        let (mut store, root_id, ghost_ids) = store_with_ghosts(1);
        assert!(!store.retry_pending_node_generation(&root_id));

        let node_id = store
            .create_pending_node_from_ghost(&ghost_ids[0])
            .expect("convert");
        // Still pending: nothing to retry.
        assert!(!store.retry_pending_node_generation(&node_id));
        store.hydrate_pending_node(&node_id, content("done"));
        assert!(!store.retry_pending_node_generation(&node_id));
    }

    #[test]
    fn out_of_order_completions_only_touch_their_own_node() {
        let (mut store, _, ghost_ids) = store_with_ghosts(2);
        let first = store
            .create_pending_node_from_ghost(&ghost_ids[0])
            .expect("convert");
        let second = store
            .create_pending_node_from_ghost(&ghost_ids[1])
            .expect("convert");

        // The second-accepted node completes before the first.
        store.hydrate_pending_node(&second, content("second result"));
        assert_eq!(
            store.node(&first).expect("node").data.generation,
            Some(Generation::Pending)
        );

        store.hydrate_pending_node(&first, content("first result"));
        assert_eq!(store.node(&first).expect("node").data.text_content, "first result");
        assert_eq!(
            store.node(&second).expect("node").data.text_content,
            "second result"
        );
    }

    #[test]
    fn hydration_applies_the_full_payload() {
        let (mut store, _, ghost_ids) = store_with_ghosts(1);
        let node_id = store
            .create_pending_node_from_ghost(&ghost_ids[0])
            .expect("convert");

        let payload = StepContent {
            text_content: "Cortisol mediates the effect.".to_string(),
            summary_title: Some("Cortisol pathway".to_string()),
            citations: vec![Citation {
                index: 1,
                title: "Stress hormones and memory".to_string(),
                url: "https://example.org/paper".to_string(),
                published_date: Some("2024-02-01".to_string()),
                snippet: None,
            }],
        };
        store.hydrate_pending_node(&node_id, payload);

        let node = store.node(&node_id).expect("node");
        assert_eq!(node.data.summary_title.as_deref(), Some("Cortisol pathway"));
        assert_eq!(node.data.citations.len(), 1);
        assert_eq!(node.data.generation, Some(Generation::Complete));
    }
}
