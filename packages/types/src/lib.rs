pub use anyhow::{Error, Result, anyhow, bail};
pub use async_trait::async_trait;
pub use schemars::JsonSchema;
pub use serde_json::Value;
pub use tokio;

pub mod error;

pub use error::{ErrorCode, GenerationError};

/// Synchronization primitives shared across the workspace.
pub mod sync {
    pub use tokio::sync::{Mutex, RwLock, broadcast, mpsc, oneshot, watch};
}

/// JSON helpers, re-exported so downstream crates do not name serde_json
/// directly.
pub mod json {
    pub use serde_json::{
        Value, from_slice, from_str, from_value, json, to_string, to_string_pretty, to_value,
        to_vec,
    };
}

/// Collision-resistant identifier for nodes, edges and projects.
pub fn create_id() -> String {
    cuid2::create_id()
}
