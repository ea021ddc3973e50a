// Resonate - Music Streaming Client for Mobile
// Copyright (C) 2025 Resonate contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Deduplicated background jobs
//!
//! At most one background job runs per asset id. Registration is checked
//! and inserted under one write lock, so two concurrent spawns for the same
//! id cannot both win. The registry entry is removed before completion is
//! signalled, on success, on error, and on panic alike; a stuck entry would
//! otherwise block every future completion attempt for that asset.

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, warn};

use crate::error::Result;

struct JobEntry {
    started_at: DateTime<Utc>,
    done: watch::Receiver<bool>,
}

/// Registry of in-flight background jobs, keyed by asset id
#[derive(Default)]
pub struct JobRegistry {
    inner: RwLock<HashMap<String, JobEntry>>,
}

impl JobRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Spawn a supervised job for `id` unless one is already running
    ///
    /// Returns `false` without spawning when a job for the id exists.
    pub async fn spawn<F>(self: &Arc<Self>, id: &str, job: F) -> bool
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(false);

        {
            let mut inner = self.inner.write().await;
            if inner.contains_key(id) {
                debug!(id, "job already in flight, not spawning a duplicate");
                return false;
            }
            inner.insert(
                id.to_string(),
                JobEntry {
                    started_at: Utc::now(),
                    done: rx,
                },
            );
        }

        let registry = Arc::clone(self);
        let id = id.to_string();

        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(job).catch_unwind().await;

            // Remove before signalling: a woken waiter must observe the
            // registry without this entry.
            registry.inner.write().await.remove(&id);

            match outcome {
                Ok(Ok(())) => debug!(id, "background job finished"),
                Ok(Err(e)) => warn!(id, error = %e, "background job failed"),
                Err(_) => error!(id, "background job panicked"),
            }

            let _ = tx.send(true);
        });

        true
    }

    /// Whether a job for `id` is currently in flight
    pub async fn is_running(&self, id: &str) -> bool {
        self.inner.read().await.contains_key(id)
    }

    /// When a job started, if one is in flight
    pub async fn started_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.inner.read().await.get(id).map(|e| e.started_at)
    }

    /// Number of jobs currently in flight
    pub async fn running_count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Wait for the job for `id` to finish
    ///
    /// Returns immediately with `false` when no job is in flight; `true`
    /// means a job existed and has now completed (in any way).
    pub async fn wait(&self, id: &str) -> bool {
        let mut rx = match self.inner.read().await.get(id) {
            Some(entry) => entry.done.clone(),
            None => return false,
        };
        // A dropped sender also means the job is gone.
        let _ = rx.wait_for(|done| *done).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AcquisitionError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    #[tokio::test]
    async fn test_spawn_dedups_per_id() {
        let registry = JobRegistry::new();
        let gate = Arc::new(Semaphore::new(0));
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let gate = Arc::clone(&gate);
            let runs = Arc::clone(&runs);
            registry
                .spawn("abc", async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    let _permit = gate.acquire().await;
                    Ok(())
                })
                .await;
        }

        assert!(registry.is_running("abc").await);
        assert_eq!(registry.running_count().await, 1);

        gate.add_permits(1);
        assert!(registry.wait("abc").await);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!registry.is_running("abc").await);
    }

    #[tokio::test]
    async fn test_distinct_ids_run_concurrently() {
        let registry = JobRegistry::new();
        let gate = Arc::new(Semaphore::new(0));

        for id in ["a", "b"] {
            let gate = Arc::clone(&gate);
            assert!(
                registry
                    .spawn(id, async move {
                        let _permit = gate.acquire().await;
                        Ok(())
                    })
                    .await
            );
        }

        assert_eq!(registry.running_count().await, 2);
        gate.add_permits(2);
        registry.wait("a").await;
        registry.wait("b").await;
        assert_eq!(registry.running_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_job_is_deregistered() {
        let registry = JobRegistry::new();
        registry
            .spawn("abc", async { Err(AcquisitionError::internal("boom")) })
            .await;

        registry.wait("abc").await;
        assert!(!registry.is_running("abc").await);

        // The id can be reused after failure.
        assert!(registry.spawn("abc", async { Ok(()) }).await);
    }

    #[tokio::test]
    async fn test_panicking_job_is_deregistered() {
        let registry = JobRegistry::new();
        registry
            .spawn("abc", async {
                panic!("segment fetch exploded");
            })
            .await;

        registry.wait("abc").await;
        assert!(!registry.is_running("abc").await);
    }

    #[tokio::test]
    async fn test_wait_without_job_returns_immediately() {
        let registry = JobRegistry::new();
        let waited = tokio::time::timeout(Duration::from_millis(50), registry.wait("missing"))
            .await
            .unwrap();
        assert!(!waited);
    }
}
