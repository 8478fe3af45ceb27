// tracker/mod.rs — Domain model for the task tracker.
//
// Pure types and functions only; persistence lives in `storage`, the HTTP
// surface in `rest`. Submodules:
//   validate — field-level validation (collect-all policy)
//   workload — active-task aggregation, candidate selection, important tasks

pub mod validate;
pub mod workload;

use serde::{Deserialize, Serialize};

/// Canonical task status. Stored and serialized as the human-readable
/// strings below; any other value is rejected at validation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Option<TaskStatus> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }

    /// Active = not yet completed. Drives workload counts and the busy report.
    pub fn is_active(self) -> bool {
        !matches!(self, TaskStatus::Completed)
    }
}

/// Whether a raw status column value counts as active. Unknown strings
/// (which validation never lets in) count as inactive.
pub fn is_active_status(status: &str) -> bool {
    TaskStatus::parse(status).is_some_and(TaskStatus::is_active)
}
