//! In-memory session results. Nothing here survives a restart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::evaluation::models::EvaluationResult;

/// Ordered, shared collection of evaluation results for one session.
#[derive(Clone, Default)]
pub struct ResultSet {
    inner: Arc<RwLock<Vec<EvaluationResult>>>,
}

impl ResultSet {
    /// Appends a batch in order, under a single write lock.
    pub async fn append(&self, results: impl IntoIterator<Item = EvaluationResult>) {
        self.inner.write().await.extend(results);
    }

    pub async fn list(&self) -> Vec<EvaluationResult> {
        self.inner.read().await.clone()
    }

    pub async fn get(&self, candidate_id: Uuid) -> Option<EvaluationResult> {
        self.inner
            .read()
            .await
            .iter()
            .find(|r| r.candidate_id == candidate_id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

/// Owns every session's [`ResultSet`] plus the cancellation handle of its
/// in-flight batch. Batch tokens are children of `root`, so cancelling the
/// root (at shutdown) aborts all of them.
#[derive(Clone, Default)]
pub struct SessionStore {
    results: Arc<RwLock<HashMap<Uuid, ResultSet>>>,
    batches: Arc<Mutex<HashMap<Uuid, CancellationToken>>>,
    root: CancellationToken,
}

impl SessionStore {
    pub fn new(root: CancellationToken) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    /// Returns the session's result set, creating it on first use. Only the
    /// write path should call this; reads go through [`SessionStore::get`].
    pub async fn results(&self, session_id: Uuid) -> ResultSet {
        if let Some(set) = self.get(session_id).await {
            return set;
        }
        self.results
            .write()
            .await
            .entry(session_id)
            .or_default()
            .clone()
    }

    /// Existing result set, if the session has one.
    pub async fn get(&self, session_id: Uuid) -> Option<ResultSet> {
        self.results.read().await.get(&session_id).cloned()
    }

    /// Registers a new batch for the session. Returns `None` while another
    /// batch for the same session is still running.
    pub fn begin_batch(&self, session_id: Uuid) -> Option<BatchGuard> {
        let mut batches = lock(&self.batches);
        if batches.contains_key(&session_id) {
            return None;
        }
        let token = self.root.child_token();
        batches.insert(session_id, token.clone());
        Some(BatchGuard {
            batches: Arc::clone(&self.batches),
            session_id,
            token,
        })
    }

    /// Cancels the session's in-flight batch. Returns whether one was running.
    pub fn cancel_batch(&self, session_id: Uuid) -> bool {
        match lock(&self.batches).get(&session_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drops the session's results. An in-flight batch is cancelled too, and
    /// whatever it still appends lands in the detached set, not the session.
    pub async fn clear(&self, session_id: Uuid) {
        self.cancel_batch(session_id);
        if let Some(set) = self.results.write().await.remove(&session_id) {
            set.clear().await;
        }
    }
}

/// Marks a session's batch as running until dropped, including when the
/// batch task panics.
pub struct BatchGuard {
    batches: Arc<Mutex<HashMap<Uuid, CancellationToken>>>,
    session_id: Uuid,
    token: CancellationToken,
}

impl BatchGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        lock(&self.batches).remove(&self.session_id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
