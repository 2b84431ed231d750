use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::filter::{derive, CategoryFilter, ViewMode, ViewSelectors};
use super::gate::{SuggestionGate, Ticket};
use super::session::SessionContext;
use crate::biographer::Biographer;
use crate::models::{Comment, CommentDraft, CommentError, Entry, NewEntry};
use crate::store::{EntryStore, Snapshot, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("no signed-in session")]
    NoSession,
    #[error(transparent)]
    Comment(#[from] CommentError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the presentation layer renders: the derived view plus the bits of
/// state around it.
#[derive(Debug, Clone, Serialize)]
pub struct LiveView {
    pub entries: Vec<Entry>,
    pub total: usize,
    pub suggestion: Option<String>,
    pub narrative: Option<String>,
    pub selectors: ViewSelectors,
}

/// Disposer for the task that pumps store pushes into the mirror.
struct SubscriptionHandle(Option<JoinHandle<()>>);

impl SubscriptionHandle {
    /// Abort the pump and wait until its store subscription is dropped.
    async fn dispose(mut self) {
        if let Some(pump) = self.0.take() {
            pump.abort();
            let _ = pump.await;
        }
    }

    fn is_live(&self) -> bool {
        self.0.as_ref().is_some_and(|pump| !pump.is_finished())
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(pump) = self.0.take() {
            pump.abort();
        }
    }
}

#[derive(Default)]
struct ViewState {
    session: Option<SessionContext>,
    /// Bumped on every bind; async results from an older epoch are dropped.
    epoch: u64,
    subscription: Option<SubscriptionHandle>,
    mirror: Snapshot,
    selectors: ViewSelectors,
    gate: SuggestionGate,
    narrative: Option<String>,
}

struct Shared {
    store: EntryStore,
    biographer: Biographer,
    state: Mutex<ViewState>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r = r.wrapping_add(1));
    }

    /// Replace the mirror wholesale and evaluate the suggestion gate, all
    /// under one lock.
    fn apply_snapshot(self: &Arc<Self>, epoch: u64, snapshot: Snapshot) {
        let due = {
            let mut state = self.state();
            if state.epoch != epoch {
                return;
            }
            state.mirror = snapshot;
            let len = state.mirror.len();
            state
                .gate
                .on_mirror_change(len)
                .map(|ticket| (ticket, state.mirror.clone()))
        };
        self.bump();

        if let Some((ticket, entries)) = due {
            self.spawn_suggestion(epoch, ticket, entries);
        }
    }

    fn spawn_suggestion(self: &Arc<Self>, epoch: u64, ticket: Ticket, entries: Snapshot) {
        tracing::debug!(entries = entries.len(), "fetching suggestion");
        let biographer = self.biographer.clone();
        let weak = Arc::downgrade(self);

        tokio::spawn(async move {
            let suggestion = biographer.suggest(&entries).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let applied = {
                let mut state = shared.state();
                state.epoch == epoch && state.gate.fulfil(ticket, suggestion)
            };
            if applied {
                shared.bump();
            } else {
                tracing::debug!("discarding stale suggestion");
            }
        });
    }
}

/// Keeps a local mirror of one user's entries in step with the store and
/// serves filtered views of it.
///
/// At most one subscription is live at a time. Dropping the synchronizer
/// aborts it.
pub struct Synchronizer {
    shared: Arc<Shared>,
}

impl Synchronizer {
    pub fn new(store: EntryStore, biographer: Biographer) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                biographer,
                state: Mutex::new(ViewState::default()),
                revision: watch::channel(0).0,
            }),
        }
    }

    /// Point the view at a new session, or at none.
    ///
    /// The previous subscription is torn down first, unconditionally. With a
    /// session, the store's current snapshot is applied before this returns.
    /// If subscribing fails the view is left unbound.
    pub async fn bind(&self, session: Option<SessionContext>) -> Result<(), StoreError> {
        let (epoch, previous) = {
            let mut state = self.shared.state();
            state.epoch += 1;
            state.session = None;
            state.mirror = Snapshot::default();
            state.gate = SuggestionGate::default();
            state.selectors = ViewSelectors::default();
            state.narrative = None;
            (state.epoch, state.subscription.take())
        };
        if let Some(previous) = previous {
            previous.dispose().await;
        }
        self.shared.bump();

        let Some(session) = session else {
            tracing::debug!("live view unbound");
            return Ok(());
        };

        let mut subscription = self.shared.store.subscribe(&session.user_id).await?;
        {
            let mut state = self.shared.state();
            if state.epoch != epoch {
                return Ok(());
            }
            state.session = Some(session.clone());
        }
        if let Some(initial) = subscription.next().await {
            self.shared.apply_snapshot(epoch, initial);
        }

        let weak = Arc::downgrade(&self.shared);
        let pump = tokio::spawn(async move {
            while let Some(snapshot) = subscription.next().await {
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                shared.apply_snapshot(epoch, snapshot);
            }
        });

        let mut state = self.shared.state();
        if state.epoch == epoch {
            state.subscription = Some(SubscriptionHandle(Some(pump)));
            tracing::info!(user_id = %session.user_id, "live view subscribed");
        } else {
            pump.abort();
        }
        Ok(())
    }

    pub fn session(&self) -> Option<SessionContext> {
        self.shared.state().session.clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.shared
            .state()
            .subscription
            .as_ref()
            .is_some_and(SubscriptionHandle::is_live)
    }

    pub fn mirror_len(&self) -> usize {
        self.shared.state().mirror.len()
    }

    pub fn suggestion(&self) -> Option<String> {
        self.shared.state().gate.held().map(str::to_string)
    }

    /// Revision counter that ticks on every state change.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Recompute the derived view from the current mirror and selectors.
    pub fn view(&self) -> LiveView {
        let state = self.shared.state();
        LiveView {
            entries: derive(&state.mirror, state.selectors.category, &state.selectors.query),
            total: state.mirror.len(),
            suggestion: state.gate.held().map(str::to_string),
            narrative: state.narrative.clone(),
            selectors: state.selectors.clone(),
        }
    }

    pub fn set_category(&self, category: CategoryFilter) {
        self.shared.state().selectors.category = category;
        self.shared.bump();
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.shared.state().selectors.query = query.into();
        self.shared.bump();
    }

    pub fn set_mode(&self, mode: ViewMode) {
        self.shared.state().selectors.mode = mode;
        self.shared.bump();
    }

    fn current(&self) -> Result<(SessionContext, u64), SyncError> {
        let state = self.shared.state();
        let session = state.session.clone().ok_or(SyncError::NoSession)?;
        Ok((session, state.epoch))
    }

    /// Write a new entry. The mirror picks it up from the next push.
    ///
    /// On success the held suggestion is cleared, the search is reset and the
    /// view returns to the timeline.
    pub async fn submit_entry(&self, mut new_entry: NewEntry) -> Result<Entry, SyncError> {
        let (session, epoch) = {
            let state = self.shared.state();
            let session = state.session.clone().ok_or(SyncError::NoSession)?;
            new_entry.ai_prompted = state.gate.held().is_some();
            (session, state.epoch)
        };

        let entry = self
            .shared
            .store
            .create(&session.user_id, new_entry)
            .await
            .inspect_err(|e| tracing::error!("Failed to save entry: {e}"))?;

        let due = {
            let mut state = self.shared.state();
            if state.epoch != epoch {
                None
            } else {
                state.gate.clear();
                state.selectors.query.clear();
                state.selectors.mode = ViewMode::Timeline;
                // If the push carrying this entry already landed, nothing
                // else will re-check the gate.
                if state.mirror.iter().any(|e| e.id == entry.id) {
                    let len = state.mirror.len();
                    state
                        .gate
                        .on_mirror_change(len)
                        .map(|ticket| (ticket, state.mirror.clone()))
                } else {
                    None
                }
            }
        };
        self.shared.bump();

        if let Some((ticket, entries)) = due {
            self.shared.spawn_suggestion(epoch, ticket, entries);
        }
        Ok(entry)
    }

    pub async fn delete_entry(&self, entry_id: &str) -> Result<bool, SyncError> {
        let (session, _) = self.current()?;
        let deleted = self
            .shared
            .store
            .delete(&session.user_id, entry_id)
            .await
            .inspect_err(|e| tracing::error!("Failed to delete entry {entry_id}: {e}"))?;
        Ok(deleted)
    }

    /// Sign an entry's guestbook. Blank author or text never reaches the
    /// store.
    pub async fn add_comment(&self, entry_id: &str, draft: CommentDraft) -> Result<Comment, SyncError> {
        let comment = draft.into_comment()?;
        let (session, _) = self.current()?;
        self.shared
            .store
            .append_comment(&session.user_id, entry_id, &comment)
            .await
            .inspect_err(|e| tracing::error!("Failed to add comment to {entry_id}: {e}"))?;
        Ok(comment)
    }

    /// Write a biography chapter from the whole mirror. The result is kept
    /// for the story page unless the session changed while it was written.
    pub async fn generate_narrative(&self) -> Result<String, SyncError> {
        let (epoch, mirror) = {
            let state = self.shared.state();
            if state.session.is_none() {
                return Err(SyncError::NoSession);
            }
            (state.epoch, state.mirror.clone())
        };

        let narrative = self.shared.biographer.narrate(&mirror).await;

        let kept = {
            let mut state = self.shared.state();
            if state.epoch == epoch {
                state.narrative = Some(narrative.clone());
                true
            } else {
                false
            }
        };
        if kept {
            self.shared.bump();
        } else {
            tracing::debug!("discarding stale narrative");
        }
        Ok(narrative)
    }
}
