use chrono::{SecondsFormat, Utc};
use sqlx::{FromRow, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::models::{Category, Comment, Entry, NewEntry};

/// One full, ordered copy of a user's entries as pushed to subscribers.
pub type Snapshot = Arc<Vec<Entry>>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("entry not found")]
    NotFound,
}

#[derive(FromRow)]
struct EntryRow {
    id: String,
    user_id: String,
    text: String,
    date: String,
    category: Category,
    image_url: Option<String>,
    ai_prompted: bool,
    created_at: String,
}

impl EntryRow {
    fn into_entry(self, comments: Vec<Comment>) -> Entry {
        Entry {
            id: self.id,
            user_id: self.user_id,
            text: self.text,
            date: self.date,
            category: self.category,
            image_url: self.image_url,
            ai_prompted: self.ai_prompted,
            created_at: self.created_at,
            comments,
        }
    }
}

#[derive(FromRow)]
struct CommentRow {
    entry_id: String,
    id: String,
    author: String,
    relation: String,
    text: String,
    created_at: i64,
}

/// A user's snapshot channel. Its lock serializes publication for that user.
type Publisher = Arc<Mutex<watch::Sender<Snapshot>>>;

/// Per-user entry collections with live snapshot publication.
///
/// Every successful write re-reads the owner's collection and replaces the
/// value in that owner's `watch` channel, so subscribers always see the whole
/// collection, never a diff. Publication for one user is serialized behind
/// that user's channel lock so a stale snapshot can never overwrite a newer
/// one. The shared map lock is only held to look a channel up.
#[derive(Clone)]
pub struct EntryStore {
    db: SqlitePool,
    publishers: Arc<Mutex<HashMap<String, Publisher>>>,
}

impl EntryStore {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            publishers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The user's entries ordered by date descending, newest writes first
    /// within a day. Comments are in append order.
    pub async fn snapshot(&self, user_id: &str) -> Result<Vec<Entry>, StoreError> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, text, date, category, image_url, ai_prompted, created_at
            FROM entries
            WHERE user_id = ?
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let comment_rows: Vec<CommentRow> = sqlx::query_as(
            r#"
            SELECT c.entry_id, c.id, c.author, c.relation, c.text, c.created_at
            FROM comments c
            JOIN entries e ON e.id = c.entry_id
            WHERE e.user_id = ?
            ORDER BY c.created_at ASC, c.rowid ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let mut by_entry: HashMap<String, Vec<Comment>> = HashMap::new();
        for row in comment_rows {
            by_entry.entry(row.entry_id).or_default().push(Comment {
                id: row.id,
                author: row.author,
                relation: row.relation,
                text: row.text,
                created_at: row.created_at,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let comments = by_entry.remove(&row.id).unwrap_or_default();
                row.into_entry(comments)
            })
            .collect())
    }

    /// Open a standing subscription to the user's collection. The first
    /// item yielded is the collection as it stands now.
    pub async fn subscribe(&self, user_id: &str) -> Result<Subscription, StoreError> {
        loop {
            let publisher = self
                .publishers
                .lock()
                .await
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(watch::channel(Snapshot::default()).0)))
                .clone();

            let sender = publisher.lock().await;
            // Retired while we waited for it; start over with a live one.
            if !self.is_current(user_id, &publisher).await {
                continue;
            }

            let snapshot = match self.snapshot(user_id).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    if sender.receiver_count() == 0 {
                        self.retire(user_id, &publisher).await;
                    }
                    return Err(e);
                }
            };
            sender.send_replace(Arc::new(snapshot));
            return Ok(Subscription {
                rx: sender.subscribe(),
                primed: false,
            });
        }
    }

    pub async fn create(&self, user_id: &str, new_entry: NewEntry) -> Result<Entry, StoreError> {
        let entry = Entry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            text: new_entry.text,
            date: new_entry.date,
            category: new_entry.category,
            image_url: new_entry.image_url,
            ai_prompted: new_entry.ai_prompted,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            comments: Vec::new(),
        };

        sqlx::query(
            r#"
            INSERT INTO entries (id, user_id, text, date, category, image_url, ai_prompted, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(&entry.text)
        .bind(&entry.date)
        .bind(entry.category)
        .bind(&entry.image_url)
        .bind(entry.ai_prompted)
        .bind(&entry.created_at)
        .execute(&self.db)
        .await?;

        self.publish(user_id).await;
        Ok(entry)
    }

    /// Delete one of the user's entries. Returns `false` when the entry does
    /// not exist or belongs to someone else.
    pub async fn delete(&self, user_id: &str, entry_id: &str) -> Result<bool, StoreError> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            "DELETE FROM comments WHERE entry_id IN (SELECT id FROM entries WHERE id = ? AND user_id = ?)",
        )
        .bind(entry_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM entries WHERE id = ? AND user_id = ?")
            .bind(entry_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        tx.commit().await?;

        if deleted {
            self.publish(user_id).await;
        }
        Ok(deleted)
    }

    pub async fn append_comment(
        &self,
        user_id: &str,
        entry_id: &str,
        comment: &Comment,
    ) -> Result<(), StoreError> {
        let owned: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entries WHERE id = ? AND user_id = ?")
            .bind(entry_id)
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
        if owned.0 == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query(
            "INSERT INTO comments (id, entry_id, author, relation, text, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&comment.id)
        .bind(entry_id)
        .bind(&comment.author)
        .bind(&comment.relation)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.db)
        .await?;

        self.publish(user_id).await;
        Ok(())
    }

    /// Push a fresh snapshot to the user's subscribers. A failed re-read is
    /// logged only: the write itself already succeeded.
    async fn publish(&self, user_id: &str) {
        let Some(publisher) = self.publishers.lock().await.get(user_id).cloned() else {
            return;
        };
        let sender = publisher.lock().await;
        if sender.receiver_count() == 0 {
            self.retire(user_id, &publisher).await;
            return;
        }

        match self.snapshot(user_id).await {
            Ok(snapshot) => {
                tracing::debug!(user_id, entries = snapshot.len(), "publishing snapshot");
                sender.send_replace(Arc::new(snapshot));
            }
            Err(e) => tracing::error!("Failed to publish snapshot for {user_id}: {e}"),
        }
    }

    /// Drop the user's channel once nobody is subscribed to it.
    pub async fn release(&self, user_id: &str) {
        let Some(publisher) = self.publishers.lock().await.get(user_id).cloned() else {
            return;
        };
        let sender = publisher.lock().await;
        if sender.receiver_count() == 0 {
            self.retire(user_id, &publisher).await;
        }
    }

    /// Whether a snapshot channel is open for the user.
    pub async fn is_publishing(&self, user_id: &str) -> bool {
        self.publishers.lock().await.contains_key(user_id)
    }

    async fn is_current(&self, user_id: &str, publisher: &Publisher) -> bool {
        self.publishers
            .lock()
            .await
            .get(user_id)
            .is_some_and(|current| Arc::ptr_eq(current, publisher))
    }

    /// Callers hold the publisher's lock.
    async fn retire(&self, user_id: &str, publisher: &Publisher) {
        let mut publishers = self.publishers.lock().await;
        if publishers.get(user_id).is_some_and(|current| Arc::ptr_eq(current, publisher)) {
            publishers.remove(user_id);
            tracing::debug!(user_id, "snapshot channel retired");
        }
    }
}

/// A cancelable stream of snapshots. Dropping it ends the subscription.
pub struct Subscription {
    rx: watch::Receiver<Snapshot>,
    primed: bool,
}

impl Subscription {
    /// Wait for the next snapshot. Intermediate snapshots published while
    /// nobody was polling are skipped; only the latest one is delivered.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
