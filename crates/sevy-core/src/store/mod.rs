pub mod memory;
pub mod mongo;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::StoreError;

/// The fixed set of public counters SEVY tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    Educators,
    AiAnswers,
    StudentsTaught,
}

impl Counter {
    pub const ALL: [Counter; 3] = [
        Counter::Educators,
        Counter::AiAnswers,
        Counter::StudentsTaught,
    ];

    /// Field name used both on the wire and in the store documents.
    pub fn field(&self) -> &'static str {
        match self {
            Counter::Educators => "sevy_educators_number",
            Counter::AiAnswers => "sevy_ai_answers",
            Counter::StudentsTaught => "students_taught",
        }
    }
}

impl std::fmt::Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field())
    }
}

/// Trait for counter storage backends.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Fetch every known counter the store currently holds. Counters with
    /// no backing document are simply absent from the result.
    async fn fetch_all(&self) -> Result<HashMap<Counter, i64>, StoreError>;

    /// Atomically add one to the named counter.
    async fn increment(&self, counter: Counter) -> Result<(), StoreError>;
}
