use crate::graph::{Citation, NodeKind, PlannedDirection, StepContent};
use cause_map_types::{JsonSchema, Result, async_trait};
use serde::{Deserialize, Serialize};

/// One candidate direction from the planning phase: cheap to produce, shown
/// as a ghost preview before any grounded generation happens.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectionPlan {
    pub summary_title: String,
    pub suggested_kind: NodeKind,
    pub search_query: String,
}

/// The full generation result for one accepted direction.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct GeneratedStep {
    pub kind: NodeKind,
    pub text_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

impl GeneratedStep {
    pub fn into_content(self) -> StepContent {
        StepContent {
            text_content: self.text_content,
            summary_title: self.summary_title,
            citations: self.citations,
        }
    }
}

/// The two async calls the core makes against an AI collaborator. Wire
/// formats, streaming and transient-retry behavior all live behind this
/// seam; the core only sees directions, steps and raw failures.
#[async_trait]
pub trait SuggestionService: Send + Sync {
    async fn plan_directions(
        &self,
        ancestry: &str,
        goal: &str,
        graded: &str,
    ) -> Result<Vec<DirectionPlan>>;

    async fn generate_step(
        &self,
        direction: &PlannedDirection,
        ancestry: &str,
        goal: &str,
        graded: &str,
    ) -> Result<GeneratedStep>;
}
