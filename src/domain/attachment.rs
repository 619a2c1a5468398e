use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentType {
    Image,
    #[default]
    File,
}

/// Metadata for binary content uploaded once to a task or comment.
///
/// The identifier doubles as the uploaded file name, so every upload needs a
/// fresh one. Re-uploading the same bytes means constructing a new attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AttachmentType,
    #[serde(default)]
    pub url: String,
    pub created_at: DateTime<Utc>,
    /// File reference in the system the content came from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

impl Attachment {
    pub fn new(prefix: &str, kind: AttachmentType) -> Self {
        Self {
            id: format!("{}_{}", prefix, Uuid::new_v4().simple()),
            kind,
            url: String::new(),
            created_at: Utc::now(),
            file_id: None,
        }
    }

    pub fn image(prefix: &str) -> Self {
        Self::new(prefix, AttachmentType::Image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let first = Attachment::image("retry");
        let second = Attachment::image("retry");
        assert!(first.id.starts_with("retry_"));
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_metadata_wire_shape() {
        let attachment = Attachment::new("photo", AttachmentType::File);
        let value = serde_json::to_value(&attachment).unwrap();
        assert_eq!(value["type"], "file");
        assert!(value.get("file_id").is_none());
    }
}
