use object_store::ObjectStore;
use std::sync::Arc;

/// Concrete storage backends a project can persist into. Everything above
/// this enum works against `Arc<dyn ObjectStore>` via `as_generic`.
#[derive(Clone, Debug)]
pub enum CauseMapStore {
    Local(Arc<object_store::local::LocalFileSystem>),
    Memory(Arc<object_store::memory::InMemory>),
    Other(Arc<dyn ObjectStore>),
}

impl CauseMapStore {
    pub fn as_generic(&self) -> Arc<dyn ObjectStore> {
        match self {
            CauseMapStore::Local(store) => store.clone() as Arc<dyn ObjectStore>,
            CauseMapStore::Memory(store) => store.clone() as Arc<dyn ObjectStore>,
            CauseMapStore::Other(store) => store.clone() as Arc<dyn ObjectStore>,
        }
    }
}
