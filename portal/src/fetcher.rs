//! Keyed content fetching
//!
//! A `ContentFetcher` owns the loading flag, rows and outcome of one view's
//! remote list. Each fetch is tagged with a generation taken when it starts;
//! completions from older generations are dropped so a slow response for a
//! previous selection never overwrites the current one.

use crate::error::Result;
use serde::Serialize;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

/// Outcome of the most recent applied fetch
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum FetchStatus {
    /// Nothing requested yet, or the view was left
    #[default]
    Idle,
    /// Rows arrived
    Ready,
    /// The gateway confirmed there are no rows
    Empty,
    /// The gateway call failed; rendered like `Empty`
    Failed(String),
}

impl FetchStatus {
    /// Whether the view should show its empty-state message
    pub fn shows_empty_state(&self) -> bool {
        matches!(self, FetchStatus::Empty | FetchStatus::Failed(_))
    }
}

/// What happens to existing rows when a fetch for a new key starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Drop rows immediately so stale results never show under the new key
    Clear,
    /// Keep showing the previous rows until the new ones arrive
    Keep,
}

/// Snapshot of a fetcher for rendering
#[derive(Debug, Clone, Serialize)]
pub struct FetchState<T> {
    pub loading: bool,
    pub data: Vec<T>,
    pub status: FetchStatus,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            data: Vec::new(),
            status: FetchStatus::Idle,
        }
    }
}

/// Handle for one in-flight fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket<K> {
    generation: u64,
    key: K,
}

impl<K> FetchTicket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }
}

struct Inner<K, T> {
    generation: u64,
    key: Option<K>,
    state: FetchState<T>,
}

/// Loading state and rows for one filter key at a time
pub struct ContentFetcher<K, T> {
    label: &'static str,
    reset: ResetPolicy,
    inner: Mutex<Inner<K, T>>,
}

impl<K, T> ContentFetcher<K, T>
where
    K: Clone + PartialEq + std::fmt::Debug,
    T: Clone,
{
    /// `label` names the content in log lines
    pub fn new(label: &'static str, reset: ResetPolicy) -> Self {
        Self {
            label,
            reset,
            inner: Mutex::new(Inner {
                generation: 0,
                key: None,
                state: FetchState::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, T>> {
        // State is replaced wholesale on every update, so a poisoned guard
        // still holds a consistent value.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a fetch for `key`, superseding any fetch still in flight
    pub fn begin(&self, key: K) -> FetchTicket<K> {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.key = Some(key.clone());
        inner.state.loading = true;
        if self.reset == ResetPolicy::Clear {
            inner.state.data.clear();
            inner.state.status = FetchStatus::Idle;
        }

        FetchTicket {
            generation: inner.generation,
            key,
        }
    }

    /// Apply a fetch result; returns false when the ticket was superseded
    pub fn complete(&self, ticket: FetchTicket<K>, result: Result<Vec<T>>) -> bool {
        let mut inner = self.lock();

        if ticket.generation != inner.generation {
            tracing::debug!(
                "Discarding stale {} response for {:?}",
                self.label,
                ticket.key
            );
            return false;
        }

        inner.state.loading = false;
        match result {
            Ok(rows) => {
                inner.state.status = if rows.is_empty() {
                    FetchStatus::Empty
                } else {
                    FetchStatus::Ready
                };
                inner.state.data = rows;
            }
            Err(e) => {
                tracing::error!("Error fetching {} for {:?}: {}", self.label, ticket.key, e);
                inner.state.data.clear();
                inner.state.status = FetchStatus::Failed(e.to_string());
            }
        }

        true
    }

    /// Begin, await `load`, and complete in one step
    pub async fn fetch<F, Fut>(&self, key: K, load: F) -> bool
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let ticket = self.begin(key.clone());
        let result = load(key).await;
        self.complete(ticket, result)
    }

    /// Forget the current key and rows, invalidating any fetch in flight
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.key = None;
        inner.state = FetchState::default();
    }

    /// Key of the most recent fetch, if any
    pub fn current_key(&self) -> Option<K> {
        self.lock().key.clone()
    }

    pub fn snapshot(&self) -> FetchState<T> {
        self.lock().state.clone()
    }
}
