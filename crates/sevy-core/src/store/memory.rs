use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;

use super::{Counter, CounterStore};

/// In-memory counter store for local development and tests. Values do not
/// survive a restart.
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<Counter, i64>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counts(counts: &[(Counter, i64)]) -> Self {
        Self {
            counters: Mutex::new(counts.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn fetch_all(&self) -> Result<HashMap<Counter, i64>, StoreError> {
        let counters = self
            .counters
            .lock()
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(counters.clone())
    }

    async fn increment(&self, counter: Counter) -> Result<(), StoreError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|e| StoreError::Query(e.to_string()))?;
        *counters.entry(counter).or_insert(0) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_store_has_no_counters() {
        let store = MemoryCounterStore::new();
        assert!(store.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_increment_creates_and_bumps() {
        let store = MemoryCounterStore::with_counts(&[(Counter::Educators, 7)]);

        store.increment(Counter::AiAnswers).await.unwrap();
        store.increment(Counter::AiAnswers).await.unwrap();
        store.increment(Counter::Educators).await.unwrap();

        let counters = store.fetch_all().await.unwrap();
        assert_eq!(counters.get(&Counter::AiAnswers), Some(&2));
        assert_eq!(counters.get(&Counter::Educators), Some(&8));
        assert_eq!(counters.get(&Counter::StudentsTaught), None);
    }
}
