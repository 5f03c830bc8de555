//! Execution journal: where the executor records what happened.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use common::ExecutionId;
use tokio::sync::RwLock;

use crate::events::WorkflowEvent;
use crate::execution::WorkflowExecution;

/// Sink for workflow execution events.
///
/// Appends cannot fail from the executor's point of view: an implementation
/// that persists events elsewhere logs its own errors instead of failing the
/// workflow it observes.
#[async_trait]
pub trait ExecutionJournal: Send + Sync {
    /// Records an event for an execution.
    async fn append(&self, execution_id: ExecutionId, event: WorkflowEvent);

    /// Returns all events recorded for an execution, in order.
    async fn events(&self, execution_id: ExecutionId) -> Vec<WorkflowEvent>;

    /// Rebuilds an execution from its events.
    async fn load(&self, execution_id: ExecutionId) -> Option<WorkflowExecution> {
        let events = self.events(execution_id).await;
        if events.is_empty() {
            return None;
        }
        Some(WorkflowExecution::from_events(events))
    }
}

/// Number of executions an [`InMemoryJournal`] keeps by default.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 1024;

#[derive(Default)]
struct JournalEntries {
    events: HashMap<ExecutionId, Vec<WorkflowEvent>>,
    // Execution ids, oldest first
    order: VecDeque<ExecutionId>,
}

/// In-memory journal holding the most recent executions.
///
/// Once `capacity` executions are recorded, starting a new one evicts the
/// oldest.
#[derive(Clone)]
pub struct InMemoryJournal {
    entries: Arc<RwLock<JournalEntries>>,
    capacity: usize,
}

impl Default for InMemoryJournal {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_JOURNAL_CAPACITY)
    }
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a journal that keeps at most `capacity` executions.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(JournalEntries::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of executions recorded.
    pub async fn execution_count(&self) -> usize {
        self.entries.read().await.events.len()
    }
}

#[async_trait]
impl ExecutionJournal for InMemoryJournal {
    async fn append(&self, execution_id: ExecutionId, event: WorkflowEvent) {
        let mut entries = self.entries.write().await;
        if !entries.events.contains_key(&execution_id) {
            while entries.order.len() >= self.capacity {
                match entries.order.pop_front() {
                    Some(oldest) => {
                        entries.events.remove(&oldest);
                    }
                    None => break,
                }
            }
            entries.order.push_back(execution_id);
        }
        entries.events.entry(execution_id).or_default().push(event);
    }

    async fn events(&self, execution_id: ExecutionId) -> Vec<WorkflowEvent> {
        self.entries
            .read()
            .await
            .events
            .get(&execution_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::WorkflowState;

    #[tokio::test]
    async fn append_and_load() {
        let journal = InMemoryJournal::new();
        let id = ExecutionId::new();

        journal
            .append(id, WorkflowEvent::workflow_started(id, "create-booking"))
            .await;
        journal.append(id, WorkflowEvent::workflow_completed()).await;

        assert_eq!(journal.events(id).await.len(), 2);
        let execution = journal.load(id).await.unwrap();
        assert_eq!(execution.state(), WorkflowState::Completed);
        assert_eq!(journal.execution_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_execution_loads_none() {
        let journal = InMemoryJournal::new();
        assert!(journal.load(ExecutionId::new()).await.is_none());
    }

    #[tokio::test]
    async fn oldest_executions_are_evicted_at_capacity() {
        let journal = InMemoryJournal::with_capacity(2);
        let ids: Vec<ExecutionId> = (0..3).map(|_| ExecutionId::new()).collect();

        for id in &ids {
            journal
                .append(*id, WorkflowEvent::workflow_started(*id, "create-vendor"))
                .await;
        }
        // Further events for a retained execution don't evict anything
        journal.append(ids[2], WorkflowEvent::workflow_completed()).await;

        assert_eq!(journal.execution_count().await, 2);
        assert!(journal.load(ids[0]).await.is_none());
        assert!(journal.load(ids[1]).await.is_some());
        assert_eq!(
            journal.load(ids[2]).await.unwrap().state(),
            WorkflowState::Completed
        );
    }

    #[test]
    fn default_capacity_is_bounded() {
        assert_eq!(InMemoryJournal::new().capacity(), DEFAULT_JOURNAL_CAPACITY);
        assert_eq!(InMemoryJournal::with_capacity(0).capacity(), 1);
    }
}
