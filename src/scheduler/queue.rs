use std::cmp::Reverse;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};

/// Ordering key for pending tasks.
///
/// Strict total order: priority ascending, then enqueue time ascending,
/// then task id as the final tie-break so equal timestamps still order
/// deterministically. Derived from the task at submission and again at
/// every requeue (a requeued entry gets a fresh timestamp, so it lands
/// behind still-fresh entries of the same priority).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct QueueEntry {
    pub priority: i64,
    pub enqueued_at: DateTime<Utc>,
    pub task_id: String,
}

/// Min-heap of pending task ids.
///
/// The queue does not deduplicate: the same task id may be pushed once on
/// submit and again on every reconciler requeue. Liveness is gated by the
/// task's state at pop time — the scheduler discards entries whose task is
/// no longer `queued`.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    // Reverse so BinaryHeap acts as a min-heap (lowest priority value first)
    heap: BinaryHeap<Reverse<QueueEntry>>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, priority: i64, enqueued_at: DateTime<Utc>, task_id: String) {
        self.heap.push(Reverse(QueueEntry {
            priority,
            enqueued_at,
            task_id,
        }));
    }

    /// Pop the minimum entry, or `None` if the queue is empty.
    pub fn pop(&mut self) -> Option<QueueEntry> {
        self.heap.pop().map(|Reverse(entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn pops_in_priority_order() {
        let mut queue = PriorityQueue::new();
        queue.push(10, at(0), "a".to_string());
        queue.push(1, at(1), "b".to_string());
        queue.push(5, at(2), "c".to_string());

        assert_eq!(queue.pop().unwrap().task_id, "b");
        assert_eq!(queue.pop().unwrap().task_id, "c");
        assert_eq!(queue.pop().unwrap().task_id, "a");
        assert!(queue.pop().is_none());
    }

    #[test]
    fn equal_priority_orders_by_enqueue_time() {
        let mut queue = PriorityQueue::new();
        queue.push(5, at(30), "late".to_string());
        queue.push(5, at(10), "early".to_string());

        assert_eq!(queue.pop().unwrap().task_id, "early");
        assert_eq!(queue.pop().unwrap().task_id, "late");
    }

    #[test]
    fn equal_priority_and_time_orders_by_task_id() {
        let mut queue = PriorityQueue::new();
        queue.push(5, at(10), "zeta".to_string());
        queue.push(5, at(10), "alpha".to_string());

        assert_eq!(queue.pop().unwrap().task_id, "alpha");
        assert_eq!(queue.pop().unwrap().task_id, "zeta");
    }

    #[test]
    fn allows_repeated_pushes_of_same_id() {
        let mut queue = PriorityQueue::new();
        queue.push(5, at(10), "a".to_string());
        queue.push(5, at(20), "a".to_string());

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap().enqueued_at, at(10));
        assert_eq!(queue.pop().unwrap().enqueued_at, at(20));
    }
}
