use crate::files::store::CauseMapStore;
use bytes::Bytes;
use cause_map_types::{JsonSchema, Result, Value, json};
use object_store::{ObjectStore, PutPayload, path::Path};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{sync::Arc, time::SystemTime};

/// Durable form of a node. `data` is stored opaquely; the only field the
/// storage layer derives itself is `parentIds`, which the in-memory node does
/// not carry.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: String,
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub data: Value,
    pub parent_ids: Vec<String>,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    /// Research goal, fed verbatim into suggestion planning.
    pub goal: String,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl ProjectRecord {
    pub fn new(name: impl Into<String>, goal: impl Into<String>) -> Self {
        let now = SystemTime::now();
        Self {
            id: cause_map_types::create_id(),
            name: name.into(),
            goal: goal.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Point reads and bulk overwrite of one project's node/edge/project tables.
/// Each table is a single JSON object in the backing store, so an overwrite
/// replaces the table atomically and a torn read is impossible.
#[derive(Clone)]
pub struct ProjectStore {
    store: Arc<dyn ObjectStore>,
    root: Path,
}

impl ProjectStore {
    pub fn new(store: &CauseMapStore, project_id: &str) -> Self {
        Self {
            store: store.as_generic(),
            root: Path::from("projects").child(project_id),
        }
    }

    fn table(&self, name: &str) -> Path {
        self.root.child(format!("{name}.json"))
    }

    async fn put_table<T: Serialize>(&self, name: &str, rows: &T) -> Result<()> {
        let bytes = json::to_vec(rows)?;
        self.store
            .put(&self.table(name), PutPayload::from(Bytes::from(bytes)))
            .await?;
        Ok(())
    }

    async fn read_table<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.store.get(&self.table(name)).await {
            Ok(result) => {
                let bytes = result.bytes().await?;
                Ok(Some(json::from_slice(&bytes)?))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Full-snapshot overwrite of both graph tables.
    pub async fn persist(&self, nodes: &[NodeRecord], edges: &[EdgeRecord]) -> Result<()> {
        self.put_table("nodes", &nodes).await?;
        self.put_table("edges", &edges).await?;
        Ok(())
    }

    /// Startup read of both graph tables. Missing tables read as empty.
    pub async fn load(&self) -> Result<(Vec<NodeRecord>, Vec<EdgeRecord>)> {
        let nodes = self.read_table("nodes").await?.unwrap_or_default();
        let edges = self.read_table("edges").await?.unwrap_or_default();
        Ok((nodes, edges))
    }

    pub async fn get_node(&self, id: &str) -> Result<Option<NodeRecord>> {
        let nodes: Vec<NodeRecord> = self.read_table("nodes").await?.unwrap_or_default();
        Ok(nodes.into_iter().find(|node| node.id == id))
    }

    pub async fn save_project(&self, project: &ProjectRecord) -> Result<()> {
        self.put_table("project", project).await
    }

    pub async fn load_project(&self) -> Result<Option<ProjectRecord>> {
        self.read_table("project").await
    }
}
