use crate::comex::dataset::ComexDataset;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// The one active comex table shared by the comex tools.
///
/// Each load replaces the table wholesale; readers get a cheap `Arc` clone.
#[derive(Clone, Default)]
pub struct ComexStore {
    current: Arc<RwLock<Option<Arc<ComexDataset>>>>,
}

impl ComexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, dataset: ComexDataset) {
        debug!(rows = dataset.num_rows(), "Replacing active comex table");
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(Arc::new(dataset));
    }

    pub fn current(&self) -> Option<Arc<ComexDataset>> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Drop the active table; returns whether one was loaded.
    pub fn clear(&self) -> bool {
        self.current.write().unwrap_or_else(|e| e.into_inner()).take().is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}
