use std::sync::Arc;

use tokio::sync::Mutex;

use crate::storage::FileStore;

/// Shared handler state. One lock serialises every request against the store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<FileStore>>,
}

impl AppState {
    pub fn new(store: FileStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }
}
