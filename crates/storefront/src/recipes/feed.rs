//! Batch loading for the infinite-scroll recommendation feed.
//!
//! A visitor's progress is a [`FeedCursor`] kept in their session. Each
//! scroll trigger loads one batch of `min(MEALS_PER_LOAD, MAX_MEALS - loaded)`
//! meals, fetched concurrently. At most one batch per cursor is in flight at
//! a time: [`InFlight::try_acquire`] hands out a guard, and a trigger that
//! finds the cursor busy is turned away rather than queued. Dropping the
//! guard (batch finished, or the request future dropped) frees the cursor.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Meal, RecipeSource};

/// Meals requested per scroll trigger.
pub const MEALS_PER_LOAD: usize = 5;

/// Meals shown per visit before the feed stops.
pub const MAX_MEALS: usize = 50;

/// Per-session feed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCursor {
    /// Identifies this visitor's feed in the in-flight registry.
    pub key: Uuid,
    /// Meals delivered so far.
    pub loaded: usize,
}

impl Default for FeedCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedCursor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            key: Uuid::new_v4(),
            loaded: 0,
        }
    }

    /// How many meals the next batch asks for.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        let remaining = MAX_MEALS.saturating_sub(self.loaded);
        if remaining < MEALS_PER_LOAD {
            remaining
        } else {
            MEALS_PER_LOAD
        }
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.loaded < MAX_MEALS
    }
}

/// One loaded batch.
#[derive(Debug, Clone, Default)]
pub struct FeedBatch {
    pub meals: Vec<Meal>,
    /// Message of the last failed fetch in the batch, if any.
    pub error: Option<String>,
    /// Cursor after this batch.
    pub cursor: Option<FeedCursor>,
}

impl FeedBatch {
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.cursor.is_some_and(|c| c.has_more())
    }

    #[must_use]
    pub fn loaded(&self) -> usize {
        self.cursor.map_or(0, |c| c.loaded)
    }
}

/// Fetch the next batch for `cursor`.
///
/// Fetches run concurrently. Failed and empty fetches are dropped from the
/// batch; the message of the last failure is kept for display.
pub async fn load_batch(source: &dyn RecipeSource, cursor: FeedCursor) -> FeedBatch {
    let wanted = cursor.batch_size();
    if wanted == 0 {
        return FeedBatch {
            meals: Vec::new(),
            error: None,
            cursor: Some(cursor),
        };
    }

    let results = join_all((0..wanted).map(|_| source.random_meal())).await;

    let mut meals = Vec::with_capacity(wanted);
    let mut error = None;
    for result in results {
        match result {
            Ok(Some(meal)) => meals.push(meal),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Random meal fetch failed");
                error = Some(e.to_string());
            }
        }
    }

    let cursor = FeedCursor {
        key: cursor.key,
        loaded: (cursor.loaded + meals.len()).min(MAX_MEALS),
    };
    FeedBatch {
        meals,
        error,
        cursor: Some(cursor),
    }
}

/// Registry of feed cursors with a batch in flight.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<Uuid>>>,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` busy. Returns `None` when it already is.
    #[must_use]
    pub fn try_acquire(&self, key: Uuid) -> Option<InFlightGuard> {
        let inserted = self
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
        inserted.then(|| InFlightGuard {
            keys: Arc::clone(&self.keys),
            key,
        })
    }

    #[must_use]
    pub fn is_busy(&self, key: Uuid) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
    }
}

/// Holds a cursor busy until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<Uuid>>>,
    key: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::recipes::RecipeError;

    /// Returns a meal on every call except those listed in `failing` (by call index).
    struct Scripted {
        calls: AtomicUsize,
        failing: Vec<usize>,
        empty: Vec<usize>,
    }

    impl Scripted {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: Vec::new(),
                empty: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl RecipeSource for Scripted {
        async fn random_meal(&self) -> Result<Option<Meal>, RecipeError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&n) {
                return Err(RecipeError::Status(500));
            }
            if self.empty.contains(&n) {
                return Ok(None);
            }
            Ok(Some(Meal {
                id: n.to_string(),
                name: format!("Meal {n}"),
                category: None,
                area: None,
                instructions: None,
                thumbnail_url: None,
                tags: None,
                youtube_url: None,
            }))
        }
    }

    fn cursor_at(loaded: usize) -> FeedCursor {
        FeedCursor {
            key: Uuid::nil(),
            loaded,
        }
    }

    #[test]
    fn test_batch_size_is_capped_by_remaining() {
        assert_eq!(cursor_at(0).batch_size(), 5);
        assert_eq!(cursor_at(45).batch_size(), 5);
        assert_eq!(cursor_at(47).batch_size(), 3);
        assert_eq!(cursor_at(50).batch_size(), 0);
        assert_eq!(cursor_at(60).batch_size(), 0);
        assert!(cursor_at(49).has_more());
        assert!(!cursor_at(50).has_more());
    }

    #[tokio::test]
    async fn test_load_batch_fetches_batch_size() {
        let source = Scripted::ok();
        let batch = load_batch(&source, cursor_at(47)).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(batch.meals.len(), 3);
        assert_eq!(batch.loaded(), 50);
        assert!(!batch.has_more());
        assert!(batch.error.is_none());
    }

    #[tokio::test]
    async fn test_load_batch_drops_failures_and_keeps_last_error() {
        let source = Scripted {
            calls: AtomicUsize::new(0),
            failing: vec![1, 3],
            empty: vec![4],
        };
        let batch = load_batch(&source, cursor_at(10)).await;

        assert_eq!(batch.meals.len(), 2);
        assert_eq!(batch.loaded(), 12);
        assert!(batch.has_more());
        assert_eq!(batch.error.as_deref(), Some("HTTP error! status: 500"));
    }

    #[tokio::test]
    async fn test_exhausted_cursor_makes_no_calls() {
        let source = Scripted::ok();
        let batch = load_batch(&source, cursor_at(MAX_MEALS)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(batch.meals.is_empty());
        assert!(!batch.has_more());
    }

    #[test]
    fn test_in_flight_rejects_second_acquire() {
        let registry = InFlight::new();
        let key = Uuid::new_v4();

        let guard = registry.try_acquire(key).unwrap();
        assert!(registry.is_busy(key));
        assert!(registry.try_acquire(key).is_none());

        // Other visitors are unaffected
        assert!(registry.try_acquire(Uuid::new_v4()).is_some());

        drop(guard);
        assert!(!registry.is_busy(key));
        assert!(registry.try_acquire(key).is_some());
    }

    #[tokio::test]
    async fn test_guard_released_when_request_is_dropped() {
        let registry = InFlight::new();
        let key = Uuid::new_v4();

        let task = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let _guard = registry.try_acquire(key).unwrap();
                std::future::pending::<()>().await;
            })
        };

        // Let the task take the guard
        while !registry.is_busy(key) {
            tokio::task::yield_now().await;
        }
        task.abort();
        let _ = task.await;

        assert!(!registry.is_busy(key));
    }
}
