use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::session::SessionContext;
use super::synchronizer::Synchronizer;
use crate::biographer::Biographer;
use crate::store::{EntryStore, StoreError};

/// One live view per signed-in user.
#[derive(Clone)]
pub struct ViewRegistry {
    store: EntryStore,
    biographer: Biographer,
    views: Arc<Mutex<HashMap<String, Arc<Synchronizer>>>>,
}

impl ViewRegistry {
    pub fn new(store: EntryStore, biographer: Biographer) -> Self {
        Self {
            store,
            biographer,
            views: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The user's live view, binding a new one on first use. A view whose
    /// subscription could not be set up is never kept.
    pub async fn open(&self, session: SessionContext) -> Result<Arc<Synchronizer>, StoreError> {
        if let Some(view) = self.views.lock().await.get(&session.user_id) {
            return Ok(view.clone());
        }

        let user_id = session.user_id.clone();
        let view = Arc::new(Synchronizer::new(self.store.clone(), self.biographer.clone()));
        view.bind(Some(session)).await.inspect_err(|e| {
            tracing::error!("Failed to subscribe live view for {user_id}: {e}");
        })?;

        // Another request may have opened the same user's view meanwhile.
        let view = self.views.lock().await.entry(user_id).or_insert(view).clone();
        Ok(view)
    }

    /// Unbind and forget the user's live view, and stop publishing to it.
    pub async fn close(&self, user_id: &str) {
        let view = self.views.lock().await.remove(user_id);
        if let Some(view) = view {
            if let Err(e) = view.bind(None).await {
                tracing::error!("Failed to unbind live view for {user_id}: {e}");
            }
            tracing::info!(user_id, "live view closed");
        }
        self.store.release(user_id).await;
    }

    pub async fn len(&self) -> usize {
        self.views.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.views.lock().await.is_empty()
    }
}
