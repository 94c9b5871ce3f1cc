use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reference::{Link, Reference};

/// Rel of the link a provider attaches to tasks that can be cancelled.
pub const CANCEL_LINK_REL: &str = "task:cancel";

/// Task status state machine
///
/// Transitions are driven by the server and only observed by polling:
/// - Queued -> Running, Succeeded, Failed, Canceled
/// - Running -> Succeeded, Failed, Canceled
/// - Succeeded, Failed, Canceled are terminal states
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted by the server, not started yet
    Queued,
    /// Work in progress on the server
    Running,
    /// Completed successfully (terminal)
    Succeeded,
    /// Completed with an error (terminal)
    Failed,
    /// Cancelled on the server (terminal)
    Canceled,
}

impl TaskStatus {
    /// Check if this status can be followed by the target status
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, target) {
            (Queued, Running | Succeeded | Failed | Canceled) => true,
            (Running, Succeeded | Failed | Canceled) => true,
            (Succeeded | Failed | Canceled, _) => false,
            _ => false,
        }
    }

    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Canceled
        )
    }

    /// Check if the task ended without doing its work
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Canceled)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Succeeded => write!(f, "succeeded"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(TaskStatus::Queued),
            "running" => Ok(TaskStatus::Running),
            "succeeded" => Ok(TaskStatus::Succeeded),
            "failed" => Ok(TaskStatus::Failed),
            "canceled" | "cancelled" => Ok(TaskStatus::Canceled),
            _ => Err(format!(
                "Invalid task status '{}'. Valid statuses: queued, running, succeeded, failed, canceled",
                s
            )),
        }
    }
}

/// Error detail a provider attaches to a failed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_error_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor_error_code: Option<String>,
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.major_error_code, &self.minor_error_code) {
            (Some(major), Some(minor)) => write!(f, "{} ({} {})", self.message, major, minor),
            (Some(major), None) => write!(f, "{} ({})", self.message, major),
            (None, Some(minor)) => write!(f, "{} ({})", self.message, minor),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

/// Server-side asynchronous work triggered by a mutating call.
///
/// Tasks are snapshots: a newer status is obtained by fetching the task again
/// through its reference, never by mutating a value held by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub reference: Reference,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl Task {
    pub fn new(reference: Reference, status: TaskStatus) -> Self {
        Self {
            reference,
            status,
            operation: None,
            operation_name: None,
            start_time: None,
            end_time: None,
            error: None,
            links: Vec::new(),
        }
    }

    pub fn href(&self) -> &str {
        &self.reference.href
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Href of the cancel action, if the provider offers one for this task.
    pub fn cancel_href(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == CANCEL_LINK_REL)
            .map(|link| link.href.as_str())
    }
}
