use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the board. Zero until the create call succeeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    New,
    #[serde(rename = "in_work")]
    InProgress,
    Done,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Normal,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Normal => "Normal",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    pub id: TaskId,
    pub board_id: i64,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub priority: u8,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub assignee: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<super::Comment>,
    /// Attachment references as reported by the board.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl Task {
    /// A fresh, not yet created task for the given board.
    pub fn draft(board_id: i64, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            board_id,
            title: title.into(),
            description: description.into(),
            status: TaskStatus::New,
            created_at: Utc::now(),
            ..Default::default()
        }
    }

    /// Business rule: 1 is high, 2 is medium, anything else (including unset) is normal.
    pub fn priority_level(&self) -> Priority {
        match self.priority {
            1 => Priority::High,
            2 => Priority::Medium,
            _ => Priority::Normal,
        }
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// Marks the task finished the way the board expects it: both the flag and the status.
    pub fn mark_done(&mut self) {
        self.done = true;
        self.status = TaskStatus::Done;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_work\""
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn test_sparse_remote_task_decodes() {
        let task: Task = serde_json::from_str(r#"{"id": 12, "title": "Fix the lamp"}"#).unwrap();
        assert_eq!(task.id, TaskId(12));
        assert_eq!(task.status, TaskStatus::New);
        assert!(task.attachments.is_empty());
        assert_eq!(task.priority_level(), Priority::Normal);
    }

    #[test]
    fn test_draft_serializes_without_optional_fields() {
        let task = Task::draft(5, "Broken chair", "");
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["id"], 0);
        assert_eq!(value["board_id"], 5);
        assert!(value.get("due_date").is_none());
        assert!(value.get("assignee").is_none());
        assert!(value.get("attachments").is_none());
    }

    #[test]
    fn test_mark_done() {
        let mut task = Task::draft(1, "Replace bulb", "");
        task.mark_done();
        assert!(task.done);
        assert_eq!(task.status, TaskStatus::Done);
    }
}
