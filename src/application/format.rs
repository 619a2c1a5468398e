use crate::domain::Task;

/// Longest description shown in a broadcast, in characters.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 200;

/// Cuts long descriptions to a preview followed by "...".
pub fn truncate_description(text: &str) -> String {
    match text.char_indices().nth(DESCRIPTION_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Broadcast text for a task that just showed up on the board.
pub fn format_task_notification(task: &Task) -> String {
    let marker = if task.done { "✅" } else { "🔵" };
    let mut text = format!("🆕 New task on the board\n\n{} {}\n", marker, task.title);

    text.push_str(&format!("Priority: {}\n", task.priority_level().label()));

    if let Some(due) = task.due_date {
        text.push_str(&format!("Due: {}\n", due.format("%d.%m.%Y")));
    }

    if !task.assignee.is_empty() {
        text.push_str(&format!("Assignee: {}\n", task.assignee));
    }

    if !task.description.is_empty() {
        text.push_str(&format!("\n{}\n", truncate_description(&task.description)));
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_short_description_untouched() {
        assert_eq!(truncate_description("door squeaks"), "door squeaks");
        let exact = "x".repeat(DESCRIPTION_PREVIEW_CHARS);
        assert_eq!(truncate_description(&exact), exact);
    }

    #[test]
    fn test_long_description_truncated_on_char_boundary() {
        let long = "ж".repeat(DESCRIPTION_PREVIEW_CHARS + 1);
        let preview = truncate_description(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), DESCRIPTION_PREVIEW_CHARS + 3);
    }

    #[test]
    fn test_notification_layout() {
        let mut task = Task::draft(1, "Fix heater", "Room 12 is cold");
        task.priority = 1;
        task.assignee = "42".to_string();
        task.due_date = Some(Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap());

        let text = format_task_notification(&task);
        assert!(text.contains("🔵 Fix heater"));
        assert!(text.contains("Priority: High"));
        assert!(text.contains("Due: 09.03.2024"));
        assert!(text.contains("Assignee: 42"));
        assert!(text.ends_with("Room 12 is cold\n"));
    }

    #[test]
    fn test_notification_skips_missing_fields() {
        let mut task = Task::draft(1, "Water plants", "");
        task.mark_done();

        let text = format_task_notification(&task);
        assert!(text.contains("✅ Water plants"));
        assert!(text.contains("Priority: Normal"));
        assert!(!text.contains("Due:"));
        assert!(!text.contains("Assignee:"));
    }
}
