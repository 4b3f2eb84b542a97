//! Short-TTL read-through cache over the counter store.
//!
//! The front-end polls the counters on every page load, so a small window
//! of staleness buys a large reduction in store traffic. A failed refresh
//! is never cached: the next request retries immediately instead of
//! waiting out the TTL on an error.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::store::{Counter, CounterStore};

/// Value of a single public counter: the stored count, or `"N/A"` on the
/// wire when the store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterValue {
    Count(i64),
    Unavailable,
}

impl Serialize for CounterValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CounterValue::Count(n) => serializer.serialize_i64(*n),
            CounterValue::Unavailable => serializer.serialize_str("N/A"),
        }
    }
}

/// Combined snapshot of every public counter, in the wire shape of the
/// `/get_all_numbers` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub sevy_educators_number: CounterValue,
    pub sevy_ai_answers: CounterValue,
    pub students_taught: CounterValue,
}

impl CounterSnapshot {
    /// Snapshot with every counter marked unavailable.
    pub fn unavailable() -> Self {
        Self {
            sevy_educators_number: CounterValue::Unavailable,
            sevy_ai_answers: CounterValue::Unavailable,
            students_taught: CounterValue::Unavailable,
        }
    }

    pub fn get(&self, counter: Counter) -> CounterValue {
        match counter {
            Counter::Educators => self.sevy_educators_number,
            Counter::AiAnswers => self.sevy_ai_answers,
            Counter::StudentsTaught => self.students_taught,
        }
    }

    fn set(&mut self, counter: Counter, value: i64) {
        let slot = match counter {
            Counter::Educators => &mut self.sevy_educators_number,
            Counter::AiAnswers => &mut self.sevy_ai_answers,
            Counter::StudentsTaught => &mut self.students_taught,
        };
        *slot = CounterValue::Count(value);
    }
}

struct CacheEntry {
    snapshot: CounterSnapshot,
    fetched_at: Instant,
}

/// Read-through cache guarding the counter store. The entry is replaced
/// wholesale on refresh; a stale read during a concurrent refresh is
/// tolerated, a torn one is not.
pub struct CounterCache {
    entry: Mutex<Option<CacheEntry>>,
    ttl: Duration,
}

impl CounterCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: Mutex::new(None),
            ttl,
        }
    }

    /// Return the cached snapshot if younger than the TTL, otherwise
    /// refresh from the store. Store failure yields an all-`"N/A"`
    /// snapshot without touching the cache entry.
    pub async fn snapshot(&self, store: &dyn CounterStore) -> CounterSnapshot {
        let mut entry = self.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                debug!("Serving counters from cache");
                return cached.snapshot;
            }
        }

        match store.fetch_all().await {
            Ok(values) => {
                let mut snapshot = CounterSnapshot::unavailable();
                for (counter, value) in values {
                    snapshot.set(counter, value);
                }
                *entry = Some(CacheEntry {
                    snapshot,
                    fetched_at: Instant::now(),
                });
                snapshot
            }
            Err(e) => {
                warn!("Counter fetch failed: {e}");
                CounterSnapshot::unavailable()
            }
        }
    }
}
