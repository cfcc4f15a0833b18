use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of a task.
///
/// Transitions: `Queued -> Assigned -> {Done, Failed}` (terminal), or
/// `Assigned -> Queued` when the reconciler requeues a timed-out
/// assignment. There is no transition out of a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Queued,
    Assigned,
    Done,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Queued => write!(f, "queued"),
            TaskState::Assigned => write!(f, "assigned"),
            TaskState::Done => write!(f, "done"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal outcome a worker reports for a task.
///
/// Restricted to the two terminal states so a result submission can never
/// move a task back into `queued` or `assigned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOutcome {
    Done,
    Failed,
}

impl From<TaskOutcome> for TaskState {
    fn from(outcome: TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Done => TaskState::Done,
            TaskOutcome::Failed => TaskState::Failed,
        }
    }
}

/// What a submitter provides when creating a task.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub task_id: String,
    pub task_type: String,
    /// Opaque to the master; only workers interpret it
    pub payload: Value,
    /// Lower value dispatches earlier
    pub priority: i64,
}

/// A task as tracked by the master.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub task_type: String,
    pub payload: Value,
    pub priority: i64,
    pub state: TaskState,
    /// Present only once the task reaches a terminal state
    pub result: Option<Value>,
}

impl Task {
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            task_id: spec.task_id,
            task_type: spec.task_type,
            payload: spec.payload,
            priority: spec.priority,
            state: TaskState::Queued,
            result: None,
        }
    }
}

/// The slice of a task handed to a worker on fetch.
///
/// Result and bookkeeping fields are deliberately not exposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHandout {
    pub task_id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub payload: Value,
}
