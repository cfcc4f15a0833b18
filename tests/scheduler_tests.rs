use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use dispatch_lite::error::DispatchError;
use dispatch_lite::scheduler::{Scheduler, TaskOutcome, TaskSpec, TaskState};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn spec(task_id: &str, priority: i64) -> TaskSpec {
    TaskSpec {
        task_id: task_id.to_string(),
        task_type: "math".to_string(),
        payload: json!({"expr": "2 + 2"}),
        priority,
    }
}

#[test]
fn submit_accepts_and_queues() {
    let mut scheduler = Scheduler::new();
    scheduler.submit(spec("t1", 10), at(0)).unwrap();

    assert_eq!(scheduler.task_count(), 1);
    let status = scheduler.status();
    assert_eq!(status.queued, 1);
    assert_eq!(status.assigned, 0);
}

#[test]
fn duplicate_task_id_is_rejected() {
    let mut scheduler = Scheduler::new();
    scheduler.submit(spec("t1", 10), at(0)).unwrap();

    let err = scheduler.submit(spec("t1", 5), at(1)).unwrap_err();
    assert!(matches!(err, DispatchError::DuplicateTask(id) if id == "t1"));
    // No partial mutation: still exactly one task
    assert_eq!(scheduler.task_count(), 1);
}

#[test]
fn task_id_stays_unique_after_completion() {
    let mut scheduler = Scheduler::new();
    scheduler.submit(spec("t1", 10), at(0)).unwrap();
    scheduler.fetch("w1", at(1)).unwrap();
    scheduler
        .submit_result("t1", TaskOutcome::Done, None, Some("w1"))
        .unwrap();

    let err = scheduler.submit(spec("t1", 10), at(2)).unwrap_err();
    assert!(matches!(err, DispatchError::DuplicateTask(_)));
}

#[test]
fn fetch_dispatches_in_ascending_priority_order() {
    let mut scheduler = Scheduler::new();
    scheduler.submit(spec("low", 10), at(0)).unwrap();
    scheduler.submit(spec("urgent", 1), at(1)).unwrap();
    scheduler.submit(spec("mid", 5), at(2)).unwrap();

    assert_eq!(scheduler.fetch("w1", at(3)).unwrap().task_id, "urgent");
    assert_eq!(scheduler.fetch("w2", at(3)).unwrap().task_id, "mid");
    assert_eq!(scheduler.fetch("w3", at(3)).unwrap().task_id, "low");
    assert!(scheduler.fetch("w4", at(3)).is_none());
}

#[test]
fn worker_holds_at_most_one_task() {
    let mut scheduler = Scheduler::new();
    scheduler.submit(spec("t1", 10), at(0)).unwrap();
    scheduler.submit(spec("t2", 10), at(0)).unwrap();

    assert!(scheduler.fetch("w1", at(1)).is_some());
    // Queue is non-empty, but w1 already holds t1
    assert!(scheduler.fetch("w1", at(2)).is_none());
    assert_eq!(scheduler.status().queued, 1);

    // After reporting, w1 may fetch again
    scheduler
        .submit_result("t1", TaskOutcome::Done, None, Some("w1"))
        .unwrap();
    assert!(scheduler.fetch("w1", at(3)).is_some());
}

#[test]
fn fetch_is_an_implicit_heartbeat() {
    let mut scheduler = Scheduler::new();
    assert!(scheduler.fetch("w1", at(5)).is_none());

    let status = scheduler.status();
    assert_eq!(status.workers, vec!["w1"]);
}

#[test]
fn fetch_returns_none_on_empty_queue() {
    let mut scheduler = Scheduler::new();
    assert!(scheduler.fetch("w1", at(0)).is_none());
}

#[test]
fn handout_exposes_only_id_type_and_payload() {
    let mut scheduler = Scheduler::new();
    scheduler
        .submit(
            TaskSpec {
                task_id: "t1".to_string(),
                task_type: "sort".to_string(),
                payload: json!({"array": [3, 1]}),
                priority: 2,
            },
            at(0),
        )
        .unwrap();

    let handout = scheduler.fetch("w1", at(1)).unwrap();
    assert_eq!(handout.task_id, "t1");
    assert_eq!(handout.task_type, "sort");
    assert_eq!(handout.payload, json!({"array": [3, 1]}));
}

#[test]
fn result_for_unknown_task_is_rejected() {
    let mut scheduler = Scheduler::new();
    let err = scheduler
        .submit_result("ghost", TaskOutcome::Done, None, None)
        .unwrap_err();
    assert!(matches!(err, DispatchError::UnknownTask(id) if id == "ghost"));
}

#[test]
fn round_trip_stores_result_and_clears_assignment() {
    let mut scheduler = Scheduler::new();
    scheduler.submit(spec("t1", 10), at(0)).unwrap();
    scheduler.fetch("w1", at(1)).unwrap();
    scheduler
        .submit_result("t1", TaskOutcome::Done, Some(json!({"x": 1})), Some("w1"))
        .unwrap();

    let task = scheduler.get_task("t1").unwrap();
    assert_eq!(task.state, TaskState::Done);
    assert_eq!(task.result, Some(json!({"x": 1})));

    // Absent from both queue and assignment table: nothing left to fetch,
    // and w1 is free to take new work
    assert!(scheduler.fetch("w2", at(2)).is_none());
    scheduler.submit(spec("t2", 10), at(3)).unwrap();
    assert!(scheduler.fetch("w1", at(4)).is_some());
}

#[test]
fn failed_outcome_is_recorded() {
    let mut scheduler = Scheduler::new();
    scheduler.submit(spec("t1", 10), at(0)).unwrap();
    scheduler.fetch("w1", at(1)).unwrap();
    scheduler
        .submit_result(
            "t1",
            TaskOutcome::Failed,
            Some(json!({"error": "boom"})),
            Some("w1"),
        )
        .unwrap();

    let status = scheduler.status();
    assert_eq!(status.failed, 1);
    assert_eq!(status.done, 0);
    assert_eq!(scheduler.get_task("t1").unwrap().state, TaskState::Failed);
}

#[test]
fn status_is_idempotent_without_mutation() {
    let mut scheduler = Scheduler::new();
    scheduler.submit(spec("t1", 10), at(0)).unwrap();
    scheduler.submit(spec("t2", 5), at(0)).unwrap();
    scheduler.fetch("w1", at(1)).unwrap();

    let first = scheduler.status();
    let second = scheduler.status();
    assert_eq!(first, second);
    assert_eq!(first.queued, 1);
    assert_eq!(first.assigned, 1);
}

#[test]
fn stale_queue_entry_is_discarded_on_pop() {
    let mut scheduler = Scheduler::new();
    scheduler.submit(spec("t1", 10), at(0)).unwrap();
    scheduler.fetch("w1", at(1)).unwrap();

    // Assignment times out and the task is requeued: the heap now carries
    // a second entry for t1 once the original worker's late result lands.
    scheduler.requeue_stale(at(100), at(100));
    scheduler
        .submit_result("t1", TaskOutcome::Done, Some(json!({"x": 1})), Some("w1"))
        .unwrap();

    // The leftover entry refers to a completed task and must be skipped
    assert!(scheduler.fetch("w2", at(101)).is_none());
    assert_eq!(scheduler.get_task("t1").unwrap().state, TaskState::Done);
}

#[test]
fn heartbeat_registers_and_updates_worker() {
    let mut scheduler = Scheduler::new();
    scheduler.heartbeat("w1", at(10));
    scheduler.heartbeat("w2", at(11));
    scheduler.heartbeat("w1", at(12));

    let status = scheduler.status();
    assert_eq!(status.workers, vec!["w1", "w2"]);
}
