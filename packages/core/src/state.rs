use crate::graph::GraphStore;
use crate::persist::{PERSIST_DEBOUNCE_MS, PersistScheduler, from_records};
use crate::suggest::{SuggestionCoordinator, SuggestionService};
use cause_map_storage::{CauseMapStore, ProjectRecord, ProjectStore};
use cause_map_types::{GenerationError, JsonSchema, Result, sync::Mutex, sync::RwLock};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration, time::SystemTime};

/// Providers a suggestion adapter exists for. Anything else fails the
/// configuration check before a request is built.
pub const SUPPORTED_PROVIDERS: [&str; 3] = ["openai", "anthropic", "gemini"];

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl ProviderSettings {
    pub fn provider_label(&self) -> String {
        self.provider
            .clone()
            .unwrap_or_else(|| "unconfigured".to_string())
    }

    pub fn ensure_configured(&self) -> Result<(), GenerationError> {
        let provider = self
            .provider
            .as_deref()
            .filter(|provider| !provider.is_empty())
            .ok_or_else(|| {
                GenerationError::configuration("unconfigured", "no suggestion provider configured")
            })?;
        if !SUPPORTED_PROVIDERS.contains(&provider) {
            return Err(GenerationError::configuration(
                provider,
                format!("unsupported provider: {provider}"),
            ));
        }
        if self.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(GenerationError::configuration(
                provider,
                "no api key configured",
            ));
        }
        Ok(())
    }
}

/// Everything one open project owns: the canonical graph, its persistence
/// pipeline and the provider configuration. The UI and the coordinator both
/// hold clones of the same arcs, so a mutation from either side is observed
/// by both.
#[derive(Clone)]
pub struct CanvasState {
    pub graph: Arc<Mutex<GraphStore>>,
    pub store: Arc<ProjectStore>,
    pub scheduler: Arc<PersistScheduler>,
    pub settings: Arc<RwLock<ProviderSettings>>,
    pub project: Arc<RwLock<ProjectRecord>>,
}

impl CanvasState {
    pub fn new(backend: &CauseMapStore, project: ProjectRecord, settings: ProviderSettings) -> Self {
        Self::with_debounce(
            backend,
            project,
            settings,
            Duration::from_millis(PERSIST_DEBOUNCE_MS),
        )
    }

    pub fn with_debounce(
        backend: &CauseMapStore,
        project: ProjectRecord,
        settings: ProviderSettings,
        debounce: Duration,
    ) -> Self {
        let store = Arc::new(ProjectStore::new(backend, &project.id));
        let scheduler = Arc::new(PersistScheduler::new(store.clone(), debounce));
        let mut graph = GraphStore::new();
        graph.set_scheduler(scheduler.clone());

        Self {
            graph: Arc::new(Mutex::new(graph)),
            store,
            scheduler,
            settings: Arc::new(RwLock::new(settings)),
            project: Arc::new(RwLock::new(project)),
        }
    }

    /// Builds a coordinator bound to this project's graph, settings and goal.
    pub fn coordinator(&self, service: Arc<dyn SuggestionService>) -> SuggestionCoordinator {
        SuggestionCoordinator::new(
            self.graph.clone(),
            service,
            self.settings.clone(),
            self.project.clone(),
        )
    }

    /// Startup read: installs the persisted tables as canonical state.
    pub async fn load_from_db(&self) -> Result<()> {
        let (node_records, edge_records) = self.store.load().await?;
        let (nodes, edges) = from_records(node_records, edge_records)?;
        self.graph.lock().await.load(nodes, edges);
        Ok(())
    }

    pub async fn save_project(&self) -> Result<()> {
        let record = {
            let mut project = self.project.write().await;
            project.updated_at = SystemTime::now();
            project.clone()
        };
        self.store.save_project(&record).await
    }
}
