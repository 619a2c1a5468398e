use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub id: i64,
    pub task_id: super::TaskId,
    pub author_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<super::Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(task_id: super::TaskId, author: &super::User, text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            author_id: author.id.to_string(),
            text: text.into(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}
