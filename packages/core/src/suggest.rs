pub mod context;
pub mod service;

pub use service::{DirectionPlan, GeneratedStep, SuggestionService};

use crate::graph::{GhostEdge, GhostNode, GraphStore, PlannedDirection, Position};
use crate::state::ProviderSettings;
use cause_map_storage::ProjectRecord;
use cause_map_types::{GenerationError, create_id, sync::Mutex, sync::RwLock};
use std::{collections::HashMap, sync::Arc};

/// The preview always shows exactly this many directions.
pub const MAX_DIRECTIONS: usize = 3;

const GHOST_X_OFFSET: f32 = 320.0;
const GHOST_Y_SPACING: f32 = 150.0;

/// Exact inputs of a generation attempt, kept so a retry re-issues the call
/// with the same direction. Entries are removed on success and retained
/// across failures; there is deliberately no other eviction.
#[derive(Debug, Clone)]
pub struct RetryContext {
    pub parent_id: String,
    pub direction: PlannedDirection,
}

/// Orchestrates the two-phase suggestion pipeline against the graph store:
/// cheap planning previews for all candidate directions up front, grounded
/// per-direction generation only for the ones the user accepts.
pub struct SuggestionCoordinator {
    graph: Arc<Mutex<GraphStore>>,
    service: Arc<dyn SuggestionService>,
    settings: Arc<RwLock<ProviderSettings>>,
    project: Arc<RwLock<ProjectRecord>>,
    retry_contexts: Mutex<HashMap<String, RetryContext>>,
}

impl SuggestionCoordinator {
    pub fn new(
        graph: Arc<Mutex<GraphStore>>,
        service: Arc<dyn SuggestionService>,
        settings: Arc<RwLock<ProviderSettings>>,
        project: Arc<RwLock<ProjectRecord>>,
    ) -> Self {
        Self {
            graph,
            service,
            settings,
            project,
            retry_contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Phase 1: plan candidate directions for `node_id` and install them as
    /// ghost previews. All-or-nothing: any failure surfaces as the single
    /// global error string and no partial ghost set is shown.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn generate(&self, node_id: &str) -> Result<(), GenerationError> {
        {
            let mut graph = self.graph.lock().await;
            graph.set_ai_error(None);
            graph.set_generating(true);
        }
        let result = self.plan_previews(node_id).await;
        {
            let mut graph = self.graph.lock().await;
            graph.set_generating(false);
            if let Err(error) = &result {
                tracing::warn!(node_id, code = error.code.as_str(), "planning failed");
                graph.set_ai_error(Some(error.to_string()));
            }
        }
        result
    }

    async fn plan_previews(&self, node_id: &str) -> Result<(), GenerationError> {
        let settings = self.settings.read().await.clone();
        settings.ensure_configured()?;
        let provider = settings.provider_label();

        let (ancestry, graded, source_position) = {
            let graph = self.graph.lock().await;
            let source = graph.node(node_id).ok_or_else(|| {
                GenerationError::new(
                    provider.clone(),
                    cause_map_types::ErrorCode::Unknown,
                    format!("source node {node_id} not found"),
                )
            })?;
            (
                context::ancestry_context(&graph, node_id),
                context::graded_context(&graph),
                source.position,
            )
        };
        let goal = self.project.read().await.goal.clone();

        let directions = self
            .service
            .plan_directions(&ancestry, &goal, &graded)
            .await
            .map_err(|err| GenerationError::classify(provider.clone(), &err.to_string()))?;

        if directions.len() < MAX_DIRECTIONS {
            return Err(GenerationError::parse(
                provider,
                format!(
                    "planner returned {} directions, expected {MAX_DIRECTIONS}",
                    directions.len()
                ),
            ));
        }

        let mut ghost_nodes = Vec::with_capacity(MAX_DIRECTIONS);
        let mut ghost_edges = Vec::with_capacity(MAX_DIRECTIONS);
        for (slot, plan) in directions.into_iter().take(MAX_DIRECTIONS).enumerate() {
            let position = Position::new(
                source_position.x + GHOST_X_OFFSET,
                source_position.y + (slot as f32 - 1.0) * GHOST_Y_SPACING,
            );
            let direction = PlannedDirection {
                id: create_id(),
                summary_title: plan.summary_title,
                suggested_kind: plan.suggested_kind,
                search_query: plan.search_query,
                source_node_id: node_id.to_string(),
            };
            let ghost = GhostNode::new(node_id.to_string(), position, direction);
            ghost_edges.push(GhostEdge::new(node_id.to_string(), ghost.id.clone()));
            ghost_nodes.push(ghost);
        }

        self.graph
            .lock()
            .await
            .set_ghost_suggestions(ghost_nodes, ghost_edges);
        Ok(())
    }

    /// Phase 2: commit one ghost as a pending node and generate its content.
    /// Returns `None` when the ghost no longer exists (already accepted or
    /// dismissed), which makes double-accept safe.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn accept_ghost(&self, ghost_id: &str) -> Option<String> {
        let (node_id, retry) = {
            let mut graph = self.graph.lock().await;
            let ghost = graph.ghost_node(ghost_id).cloned()?;
            let node_id = graph.create_pending_node_from_ghost(ghost_id)?;
            (
                node_id,
                RetryContext {
                    parent_id: ghost.parent_id,
                    direction: ghost.direction,
                },
            )
        };
        self.retry_contexts
            .lock()
            .await
            .insert(node_id.clone(), retry);
        self.run_generation(&node_id).await;
        Some(node_id)
    }

    /// Caller-initiated retry. Reuses the cached direction; a cache miss or
    /// a non-retryable node state is a safe no-op.
    pub async fn retry_pending_node_generation(&self, node_id: &str) -> bool {
        if !self.retry_contexts.lock().await.contains_key(node_id) {
            tracing::warn!(node_id, "retry requested without a cached context");
            return false;
        }
        if !self
            .graph
            .lock()
            .await
            .retry_pending_node_generation(node_id)
        {
            return false;
        }
        self.run_generation(node_id).await;
        true
    }

    async fn run_generation(&self, node_id: &str) {
        let Some(retry) = self.retry_contexts.lock().await.get(node_id).cloned() else {
            tracing::warn!(node_id, "no retry context for generation");
            return;
        };
        let settings = self.settings.read().await.clone();
        if let Err(error) = settings.ensure_configured() {
            self.graph
                .lock()
                .await
                .mark_pending_node_error(node_id, error);
            return;
        }
        let provider = settings.provider_label();

        let (ancestry, graded) = {
            let graph = self.graph.lock().await;
            (
                context::ancestry_context(&graph, &retry.parent_id),
                context::graded_context(&graph),
            )
        };
        let goal = self.project.read().await.goal.clone();

        match self
            .service
            .generate_step(&retry.direction, &ancestry, &goal, &graded)
            .await
        {
            Ok(step) => {
                self.graph
                    .lock()
                    .await
                    .hydrate_pending_node(node_id, step.into_content());
                self.retry_contexts.lock().await.remove(node_id);
            }
            Err(err) => {
                let error = GenerationError::classify(provider, &err.to_string());
                tracing::warn!(node_id, code = error.code.as_str(), "generation failed");
                self.graph
                    .lock()
                    .await
                    .mark_pending_node_error(node_id, error);
            }
        }
    }
}
