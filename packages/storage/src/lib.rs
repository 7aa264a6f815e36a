pub mod files;
pub mod project;

pub use files::store::CauseMapStore;
pub use project::{EdgeRecord, NodeRecord, ProjectRecord, ProjectStore};

pub use object_store;
pub use object_store::path::Path;
