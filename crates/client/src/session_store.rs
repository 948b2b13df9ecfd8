//! Session persistence bridging a synchronous read path and asynchronous
//! durable storage.
//!
//! [`SessionStore`] keeps the current [`Session`] in an in-memory cache
//! that every synchronous caller reads, and mirrors it to a [`Storage`]
//! backend in the background. Writes are fire-and-forget: they are queued
//! to a single writer task, applied in order, and failures are logged
//! rather than surfaced. The cache stays authoritative for the lifetime of
//! the process.
//!
//! Lifecycle: create the store once, call [`SessionStore::load_async`] at
//! startup, then `save`/`destroy` as the user signs in and out. Until the
//! first `load_async` completes, [`SessionStore::load_sync`] may report no
//! session even though one is stored on disk.

use std::sync::Arc;

use journal_core::session::Session;
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};

use crate::storage::Storage;

/// Storage key under which the serialized session is kept.
pub const SESSION_KEY: &str = "supabase.auth.token";

/// Work item for the background writer.
enum WriteOp {
    Save(String),
    Remove,
    /// Acknowledged once every earlier op has been applied.
    Flush(oneshot::Sender<()>),
}

pub struct SessionStore {
    cache: RwLock<Option<Session>>,
    storage: Arc<dyn Storage>,
    writes: mpsc::UnboundedSender<WriteOp>,
}

impl SessionStore {
    /// Create a store over `storage` and spawn its writer task.
    ///
    /// Must be called from within a Tokio runtime. The writer exits once
    /// the store is dropped and its queue drained.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let (writes, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(Arc::clone(&storage), rx));

        Self {
            cache: RwLock::new(None),
            storage,
            writes,
        }
    }

    /// Make `session` current and queue it for durable storage.
    ///
    /// The cache is updated before this returns, so an immediate
    /// [`load_sync`](Self::load_sync) observes the new session.
    pub fn save(&self, session: &Session) {
        *self.cache.write() = Some(session.clone());

        match session.to_json() {
            Ok(json) => self.enqueue(WriteOp::Save(json)),
            Err(e) => {
                tracing::error!(user_id = %session.user_id, error = %e, "Failed to serialize session");
            }
        }
    }

    /// The cached session. Never touches durable storage.
    pub fn load_sync(&self) -> Option<Session> {
        self.cache.read().clone()
    }

    /// Read the session from durable storage and refresh the cache.
    ///
    /// Pending writes are applied first. An absent key or an unreadable
    /// document both yield `None`; in the latter case the cache is left
    /// untouched and the problem is logged.
    pub async fn load_async(&self) -> Option<Session> {
        self.flush().await;

        let json = match self.storage.get_item(SESSION_KEY).await {
            Ok(Some(json)) if !json.trim().is_empty() => json,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored session");
                return None;
            }
        };

        match Session::from_json(&json) {
            Ok(session) => {
                *self.cache.write() = Some(session.clone());
                tracing::debug!(user_id = %session.user_id, "Restored session from storage");
                Some(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored session is unreadable, ignoring it");
                None
            }
        }
    }

    /// Forget the current session and queue removal of the stored copy.
    pub fn destroy(&self) {
        *self.cache.write() = None;
        self.enqueue(WriteOp::Remove);
    }

    /// Wait until every write queued so far has reached storage.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.writes.send(WriteOp::Flush(tx)).is_ok() {
            // The writer only drops the sender if it is shutting down.
            let _ = rx.await;
        }
    }

    fn enqueue(&self, op: WriteOp) {
        if self.writes.send(op).is_err() {
            tracing::warn!("Session writer is gone, durable storage not updated");
        }
    }
}

async fn run_writer(storage: Arc<dyn Storage>, mut rx: mpsc::UnboundedReceiver<WriteOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Save(json) => {
                if let Err(e) = storage.set_item(SESSION_KEY, &json).await {
                    tracing::warn!(error = %e, "Failed to persist session");
                }
            }
            WriteOp::Remove => {
                if let Err(e) = storage.remove_item(SESSION_KEY).await {
                    tracing::warn!(error = %e, "Failed to remove stored session");
                }
            }
            WriteOp::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}
