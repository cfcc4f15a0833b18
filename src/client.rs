//! Typed HTTP client for the master API, used by workers and the CLI.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{DispatchError, Result};
use crate::scheduler::{StatusSnapshot, TaskHandout, TaskOutcome, TaskSpec};

#[derive(Debug, Clone)]
pub struct MasterClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct GetTaskResponse {
    task: Option<TaskHandout>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

impl MasterClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn submit_task(&self, spec: &TaskSpec) -> Result<()> {
        let body = json!({
            "task_id": spec.task_id,
            "type": spec.task_type,
            "payload": spec.payload,
            "priority": spec.priority,
        });
        let response = self
            .http
            .post(format!("{}/submit_task", self.base_url))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn get_task(&self, worker_id: &str) -> Result<Option<TaskHandout>> {
        let response = self
            .http
            .get(format!("{}/get_task", self.base_url))
            .query(&[("worker_id", worker_id)])
            .send()
            .await?;
        let response = Self::check(response).await?;
        let body: GetTaskResponse = response.json().await?;
        Ok(body.task)
    }

    pub async fn submit_result(
        &self,
        task_id: &str,
        outcome: TaskOutcome,
        result: Value,
        worker_id: &str,
    ) -> Result<()> {
        let body = json!({
            "task_id": task_id,
            "status": outcome,
            "result": result,
            "worker_id": worker_id,
        });
        let response = self
            .http
            .post(format!("{}/submit_result", self.base_url))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Report liveness with the worker's current clock, in epoch seconds.
    pub async fn heartbeat(&self, worker_id: &str, timestamp: f64) -> Result<()> {
        let body = json!({
            "worker_id": worker_id,
            "timestamp": timestamp,
        });
        let response = self
            .http
            .post(format!("{}/heartbeat", self.base_url))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn status(&self) -> Result<StatusSnapshot> {
        let response = self
            .http
            .get(format!("{}/status", self.base_url))
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// Map non-2xx responses back onto the error taxonomy the master uses.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };

        Err(match status {
            StatusCode::BAD_REQUEST => DispatchError::DuplicateTask(message),
            StatusCode::NOT_FOUND => DispatchError::UnknownTask(message),
            _ => DispatchError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}
