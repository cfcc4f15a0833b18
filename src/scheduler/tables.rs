use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Binding of a task to the worker currently executing it.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub worker_id: String,
    pub assigned_at: DateTime<Utc>,
}

/// Tracks which worker holds which task and since when.
///
/// Keeps a worker -> task reverse index alongside the task-keyed map so
/// the "does this worker already hold a task" check in fetch is O(1).
/// A worker holds at most one task at a time, so the index maps to a
/// single task id.
#[derive(Debug, Default)]
pub struct AssignmentTable {
    by_task: HashMap<String, Assignment>,
    by_worker: HashMap<String, String>,
}

impl AssignmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task_id: String, worker_id: String, assigned_at: DateTime<Utc>) {
        self.by_worker.insert(worker_id.clone(), task_id.clone());
        self.by_task.insert(
            task_id,
            Assignment {
                worker_id,
                assigned_at,
            },
        );
    }

    pub fn remove_by_task(&mut self, task_id: &str) -> Option<Assignment> {
        let assignment = self.by_task.remove(task_id)?;
        self.by_worker.remove(&assignment.worker_id);
        Some(assignment)
    }

    pub fn remove_by_worker(&mut self, worker_id: &str) -> Option<(String, Assignment)> {
        let task_id = self.by_worker.remove(worker_id)?;
        let assignment = self.by_task.remove(&task_id)?;
        Some((task_id, assignment))
    }

    /// Task currently held by the given worker, if any
    pub fn task_for_worker(&self, worker_id: &str) -> Option<&str> {
        self.by_worker.get(worker_id).map(String::as_str)
    }

    pub fn get(&self, task_id: &str) -> Option<&Assignment> {
        self.by_task.get(task_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Assignment)> {
        self.by_task.iter()
    }

    pub fn len(&self) -> usize {
        self.by_task.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_task.is_empty()
    }
}

/// Last-heartbeat timestamp per known worker.
#[derive(Debug, Default)]
pub struct WorkerTable {
    last_seen: HashMap<String, DateTime<Utc>>,
}

impl WorkerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a heartbeat. Registers the worker on first contact.
    pub fn upsert(&mut self, worker_id: &str, at: DateTime<Utc>) {
        self.last_seen.insert(worker_id.to_string(), at);
    }

    pub fn remove(&mut self, worker_id: &str) -> Option<DateTime<Utc>> {
        self.last_seen.remove(worker_id)
    }

    pub fn last_seen(&self, worker_id: &str) -> Option<DateTime<Utc>> {
        self.last_seen.get(worker_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DateTime<Utc>)> {
        self.last_seen.iter()
    }

    /// Known worker ids, sorted for stable output
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.last_seen.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
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
    fn assignment_reverse_index_stays_in_sync() {
        let mut table = AssignmentTable::new();
        table.insert("t1".to_string(), "w1".to_string(), at(0));

        assert_eq!(table.task_for_worker("w1"), Some("t1"));
        assert_eq!(table.get("t1").unwrap().worker_id, "w1");

        let removed = table.remove_by_task("t1").unwrap();
        assert_eq!(removed.worker_id, "w1");
        assert!(table.task_for_worker("w1").is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn assignment_remove_by_worker() {
        let mut table = AssignmentTable::new();
        table.insert("t1".to_string(), "w1".to_string(), at(5));

        let (task_id, assignment) = table.remove_by_worker("w1").unwrap();
        assert_eq!(task_id, "t1");
        assert_eq!(assignment.assigned_at, at(5));
        assert!(table.get("t1").is_none());
    }

    #[test]
    fn worker_table_upsert_overwrites() {
        let mut table = WorkerTable::new();
        table.upsert("w1", at(10));
        table.upsert("w1", at(20));

        assert_eq!(table.len(), 1);
        assert_eq!(table.last_seen("w1"), Some(at(20)));
    }

    #[test]
    fn worker_ids_are_sorted() {
        let mut table = WorkerTable::new();
        table.upsert("w2", at(0));
        table.upsert("w1", at(0));
        table.upsert("w3", at(0));

        assert_eq!(table.ids(), vec!["w1", "w2", "w3"]);
    }
}
