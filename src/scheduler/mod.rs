//! The master's scheduling state machine.
//!
//! [`Scheduler`] composes the four stores — task map, priority queue,
//! assignment table, worker table — behind one facade. Every operation
//! mutates under a single exclusive lock held by the caller (see
//! [`crate::node`]), so operations are linearizable with respect to each
//! other and `status` sees a consistent snapshot.
//!
//! Time is passed in explicitly (`DateTime<Utc>`) rather than read from
//! the system clock, so the state machine is testable without sleeping.

pub mod queue;
pub mod tables;
pub mod task;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DispatchError, Result};
use queue::PriorityQueue;
use tables::{AssignmentTable, WorkerTable};
pub use task::{Task, TaskHandout, TaskOutcome, TaskSpec, TaskState};

/// Point-in-time counts of tasks per lifecycle state plus known workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub queued: usize,
    pub assigned: usize,
    pub done: usize,
    pub failed: usize,
    pub workers: Vec<String>,
}

/// Master scheduling state: submit / fetch / complete, plus the sweep
/// entry points used by the reconciler.
#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: HashMap<String, Task>,
    queue: PriorityQueue,
    assignments: AssignmentTable,
    workers: WorkerTable,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a new task. Task ids are permanently unique: resubmitting an
    /// id that was ever accepted fails, even after the task completed.
    pub fn submit(&mut self, spec: TaskSpec, now: DateTime<Utc>) -> Result<()> {
        if self.tasks.contains_key(&spec.task_id) {
            return Err(DispatchError::DuplicateTask(spec.task_id));
        }

        let task_id = spec.task_id.clone();
        let priority = spec.priority;
        let task_type = spec.task_type.clone();
        self.queue.push(priority, now, task_id.clone());
        self.tasks.insert(task_id.clone(), Task::new(spec));

        tracing::info!(task_id = %task_id, task_type = %task_type, priority, "Task submitted");
        Ok(())
    }

    /// Hand out the next pending task to a worker.
    ///
    /// A fetch is an implicit heartbeat, recorded before anything else.
    /// Returns `None` without consuming the queue when the worker already
    /// holds an assignment, and `None` when no pending task remains.
    pub fn fetch(&mut self, worker_id: &str, now: DateTime<Utc>) -> Option<TaskHandout> {
        self.workers.upsert(worker_id, now);

        // One task per worker at a time
        if self.assignments.task_for_worker(worker_id).is_some() {
            return None;
        }

        while let Some(entry) = self.queue.pop() {
            let Some(task) = self.tasks.get_mut(&entry.task_id) else {
                continue;
            };
            // The heap does not deduplicate; an entry can outlive the
            // task's stay in the queue (e.g. a late result landed while a
            // requeued duplicate was still buried in the heap). Discard
            // entries whose task has moved on.
            if task.state != TaskState::Queued {
                tracing::debug!(task_id = %entry.task_id, state = %task.state, "Discarding stale queue entry");
                continue;
            }

            task.state = TaskState::Assigned;
            self.assignments
                .insert(entry.task_id.clone(), worker_id.to_string(), now);

            tracing::info!(task_id = %entry.task_id, worker_id, "Task assigned");
            return Some(TaskHandout {
                task_id: task.task_id.clone(),
                task_type: task.task_type.clone(),
                payload: task.payload.clone(),
            });
        }

        None
    }

    /// Record a terminal outcome for a task.
    ///
    /// The assignment is removed regardless of which worker claims to
    /// submit; `worker_id` is trusted for logging only.
    pub fn submit_result(
        &mut self,
        task_id: &str,
        outcome: TaskOutcome,
        result: Option<Value>,
        worker_id: Option<&str>,
    ) -> Result<()> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| DispatchError::UnknownTask(task_id.to_string()))?;

        task.state = outcome.into();
        task.result = result;
        self.assignments.remove_by_task(task_id);

        tracing::info!(
            task_id,
            worker_id = worker_id.unwrap_or("<unknown>"),
            state = %task.state,
            "Result received"
        );
        Ok(())
    }

    /// Record a worker heartbeat at the given time.
    ///
    /// The timestamp is stored verbatim — out-of-order values are accepted
    /// as-is, the system trusts client clocks.
    pub fn heartbeat(&mut self, worker_id: &str, at: DateTime<Utc>) {
        self.workers.upsert(worker_id, at);
    }

    /// Aggregate counts per lifecycle state and the known worker ids.
    pub fn status(&self) -> StatusSnapshot {
        let mut snapshot = StatusSnapshot {
            queued: 0,
            assigned: 0,
            done: 0,
            failed: 0,
            workers: self.workers.ids(),
        };
        for task in self.tasks.values() {
            match task.state {
                TaskState::Queued => snapshot.queued += 1,
                TaskState::Assigned => snapshot.assigned += 1,
                TaskState::Done => snapshot.done += 1,
                TaskState::Failed => snapshot.failed += 1,
            }
        }
        snapshot
    }

    /// Stored task lookup, mainly for clients inspecting results.
    pub fn get_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    /// Remove every worker whose last heartbeat is older than the cutoff.
    ///
    /// Deliberately does NOT touch any assignment the evicted worker
    /// holds: liveness tracking and task-timeout tracking are independent
    /// signals. An orphaned task is recovered by [`requeue_stale`]
    /// (see DESIGN.md) once its own timeout elapses.
    ///
    /// [`requeue_stale`]: Scheduler::requeue_stale
    pub fn evict_dead_workers(&mut self, cutoff: DateTime<Utc>) -> Vec<String> {
        let dead: Vec<String> = self
            .workers
            .iter()
            .filter(|(_, last_seen)| **last_seen < cutoff)
            .map(|(id, _)| id.clone())
            .collect();

        for worker_id in &dead {
            self.workers.remove(worker_id);
            tracing::warn!(worker_id = %worker_id, "Worker missed heartbeat, removing");
        }
        dead
    }

    /// Requeue every assignment handed out before the cutoff.
    ///
    /// The task keeps its priority but gets a fresh queue timestamp of
    /// `now`, so it lands behind still-fresh entries of equal priority.
    /// This is the system's sole retry mechanism; there is no retry
    /// ceiling.
    pub fn requeue_stale(&mut self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Vec<String> {
        let stale: Vec<String> = self
            .assignments
            .iter()
            .filter(|(_, assignment)| assignment.assigned_at < cutoff)
            .map(|(task_id, _)| task_id.clone())
            .collect();

        for task_id in &stale {
            let Some(assignment) = self.assignments.remove_by_task(task_id) else {
                continue;
            };
            let Some(task) = self.tasks.get_mut(task_id) else {
                continue;
            };
            task.state = TaskState::Queued;
            self.queue.push(task.priority, now, task_id.clone());
            tracing::warn!(
                task_id = %task_id,
                worker_id = %assignment.worker_id,
                "Task timed out, requeued"
            );
        }
        stale
    }

    /// Number of tasks ever accepted (all states).
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}
