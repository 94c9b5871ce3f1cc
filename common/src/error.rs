use std::time::Duration;
use thiserror::Error;

use crate::task::{TaskError, TaskStatus};

/// Errors surfaced by provider bindings and the task monitor.
///
/// A missing resource on a read is not an error: reads return `None` or an
/// empty collection instead.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("{method} {url} returned unexpected status {status}: {body}")]
    UnexpectedResponse {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("task {task} finished as {status}{}", detail_suffix(.detail))]
    TaskFailed {
        task: String,
        status: TaskStatus,
        detail: Option<TaskError>,
    },

    #[error("task {task} still {last_status} after {}s", .timeout.as_secs())]
    TaskTimeout {
        task: String,
        timeout: Duration,
        last_status: TaskStatus,
    },

    #[error("stopped waiting for task {task}")]
    Cancelled { task: String },

    #[error("transport error: {0}")]
    Transport(String),

    /// A blocking call outlived the ceiling of its operation category.
    #[error("call did not complete within {}s", .0.as_secs())]
    CallTimeout(Duration),

    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("failed to encode request body: {0}")]
    Encode(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("no endpoint configured for zone {0}")]
    UnknownZone(String),

    #[error("{resource} has no '{rel}' link")]
    MissingLink { resource: String, rel: String },
}

fn detail_suffix(detail: &Option<TaskError>) -> String {
    detail
        .as_ref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

impl CloudError {
    /// Collaborator-level failures worth retrying while polling.
    pub fn is_transient(&self) -> bool {
        matches!(self, CloudError::Transport(_))
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            CloudError::UnexpectedResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_failed_message_includes_detail() {
        let err = CloudError::TaskFailed {
            task: "https://vcloud.example.com/api/task/1".to_string(),
            status: TaskStatus::Failed,
            detail: Some(TaskError {
                message: "disk full".to_string(),
                major_error_code: Some(500),
                minor_error_code: None,
            }),
        };
        assert_eq!(
            err.to_string(),
            "task https://vcloud.example.com/api/task/1 finished as failed: disk full (500)"
        );
    }

    #[test]
    fn test_task_failed_message_without_detail() {
        let err = CloudError::TaskFailed {
            task: "t1".to_string(),
            status: TaskStatus::Canceled,
            detail: None,
        };
        assert_eq!(err.to_string(), "task t1 finished as canceled");
    }

    #[test]
    fn test_timeout_message() {
        let err = CloudError::TaskTimeout {
            task: "t1".to_string(),
            timeout: Duration::from_secs(180),
            last_status: TaskStatus::Running,
        };
        assert_eq!(err.to_string(), "task t1 still running after 180s");
    }

    #[test]
    fn test_only_transport_errors_are_transient() {
        assert!(CloudError::Transport("connection reset".to_string()).is_transient());
        assert!(!CloudError::Auth("bad token".to_string()).is_transient());
        let unexpected = CloudError::UnexpectedResponse {
            method: "GET".to_string(),
            url: "http://x".to_string(),
            status: 503,
            body: String::new(),
        };
        assert!(!unexpected.is_transient());
        assert_eq!(unexpected.status(), Some(503));

        let elapsed = CloudError::CallTimeout(Duration::from_secs(180));
        assert!(!elapsed.is_transient());
        assert_eq!(elapsed.to_string(), "call did not complete within 180s");
    }
}
