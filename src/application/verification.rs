//! Delayed check that a task we created actually landed on the board.
//!
//! Each created task gets one check after `delay`. A mismatch on the first
//! check re-creates the task once with a recovery marker in its title and
//! schedules another check; a second mismatch, or any failure while
//! correcting, escalates to the sender and every admin.

use crate::domain::{Attachment, ChatId, Task, TaskId, User};
use crate::ports::{Notifier, Scheduler, TaskRepository, UserDirectory};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const VERIFICATION_DELAY: Duration = Duration::from_secs(2 * 60);
pub const VERIFICATION_FETCH_LIMIT: usize = 100;
pub const RECOVERY_MARKER: &str = "recovered";

/// Everything needed to re-check, and if necessary re-create, one task.
#[derive(Debug, Clone)]
pub struct VerificationRecord {
    pub task: Task,
    pub sender: User,
    /// Text the sender submitted; must appear in the remote description.
    pub content: String,
    pub has_image: bool,
    pub image: Option<Vec<u8>>,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    NotFound,
    Content,
    MissingImage,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::NotFound => write!(f, "task not found on the board"),
            Mismatch::Content => write!(f, "task content does not match"),
            Mismatch::MissingImage => write!(f, "image is missing or failed to upload"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Confirmed,
    /// Re-created under a new id; another check is scheduled.
    Recreated(TaskId),
    /// Sender and admins were told; nothing else will happen.
    Escalated(String),
}

/// Compares the board's copy of a task with what we sent.
pub fn compare(remote: Option<&Task>, record: &VerificationRecord) -> Result<(), Mismatch> {
    let remote = remote.ok_or(Mismatch::NotFound)?;

    if remote.title != record.task.title {
        return Err(Mismatch::Content);
    }
    if record.retry_count > 0 && !remote.title.contains(RECOVERY_MARKER) {
        return Err(Mismatch::Content);
    }
    if !record.content.is_empty() && !remote.description.contains(&record.content) {
        return Err(Mismatch::Content);
    }
    if record.has_image && !remote.has_attachments() {
        return Err(Mismatch::MissingImage);
    }

    Ok(())
}

#[derive(Clone)]
pub struct TaskVerifier {
    repository: Arc<dyn TaskRepository>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
    scheduler: Arc<dyn Scheduler>,
    delay: Duration,
}

impl TaskVerifier {
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            repository,
            users,
            notifier,
            scheduler,
            delay: VERIFICATION_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Schedules the first check for a freshly created task and returns at once.
    pub fn start_task_verification(
        &self,
        task: Task,
        sender: User,
        content: String,
        has_image: bool,
        image: Option<Vec<u8>>,
    ) {
        tracing::info!(
            "Scheduling verification of task {} in {:?}",
            task.id,
            self.delay
        );
        self.schedule_check(VerificationRecord {
            task,
            sender,
            content,
            has_image,
            image,
            retry_count: 0,
            created_at: Utc::now(),
        });
    }

    fn schedule_check(&self, record: VerificationRecord) {
        let verifier = self.clone();
        self.scheduler.schedule(
            self.delay,
            Box::pin(async move {
                verifier.verify_task(record).await;
            }),
        );
    }

    pub async fn verify_task(&self, record: VerificationRecord) -> VerificationOutcome {
        let tasks = match self.repository.get_tasks(VERIFICATION_FETCH_LIMIT).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!("Verification of task {} could not fetch tasks: {}", record.task.id, e);
                let reason = format!("failed to fetch tasks from the board: {e}");
                return self.escalate(&record, None, reason).await;
            }
        };

        let remote = tasks.iter().find(|t| t.id == record.task.id);
        match compare(remote, &record) {
            Ok(()) => {
                tracing::info!("Task {} verified", record.task.id);
                VerificationOutcome::Confirmed
            }
            Err(mismatch) => {
                let remote = remote.cloned();
                self.handle_mismatch(record, remote, mismatch).await
            }
        }
    }

    async fn handle_mismatch(
        &self,
        mut record: VerificationRecord,
        remote: Option<Task>,
        mismatch: Mismatch,
    ) -> VerificationOutcome {
        tracing::warn!(
            "Task {} failed verification (attempt {}): {}",
            record.task.id,
            record.retry_count + 1,
            mismatch
        );

        if record.retry_count > 0 {
            return self
                .escalate(&record, remote.as_ref(), mismatch.to_string())
                .await;
        }

        let mut replacement = record.task.clone();
        replacement.id = TaskId::default();
        replacement.attachments.clear();
        replacement.title = format!("{} ({})", record.task.title, RECOVERY_MARKER);

        if let Err(e) = self.repository.create_task(&mut replacement).await {
            let reason = format!("failed to re-create the task: {e}");
            return self.escalate(&record, remote.as_ref(), reason).await;
        }

        if record.has_image {
            match &record.image {
                Some(image) => {
                    let attachment = Attachment::image("retry");
                    if let Err(e) = self
                        .repository
                        .upload_attachment(replacement.id, &attachment, image)
                        .await
                    {
                        let reason = format!("failed to re-upload the image: {e}");
                        return self.escalate(&record, remote.as_ref(), reason).await;
                    }
                }
                None => tracing::warn!(
                    "Task {} expects an image but none was kept for re-upload",
                    record.task.id
                ),
            }
        }

        tracing::info!(
            "Re-created task {} as {}, checking again in {:?}",
            record.task.id,
            replacement.id,
            self.delay
        );
        let id = replacement.id;
        record.task = replacement;
        record.retry_count += 1;
        self.schedule_check(record);
        VerificationOutcome::Recreated(id)
    }

    /// Tells the sender and every admin. Delivery failures are only logged.
    async fn escalate(
        &self,
        record: &VerificationRecord,
        remote: Option<&Task>,
        reason: String,
    ) -> VerificationOutcome {
        tracing::error!("Escalating task {}: {}", record.task.id, reason);

        let sender_chat = ChatId::from(record.sender.id);
        let sender_text = format!(
            "There was a problem creating your task: {reason}\nPlease contact an administrator."
        );
        if let Err(e) = self.notifier.send(sender_chat, &sender_text).await {
            tracing::warn!("Failed to notify sender {}: {}", record.sender.id, e);
        }

        let admin_text = failure_report(record, remote, &reason);
        let mut admins: Vec<User> = self
            .users
            .get_users()
            .into_values()
            .filter(User::is_admin)
            .collect();
        admins.sort_by_key(|u| u.id.0);

        for admin in admins {
            if let Err(e) = self.notifier.send(ChatId::from(admin.id), &admin_text).await {
                tracing::warn!("Failed to notify admin {}: {}", admin.id, e);
            }
        }

        VerificationOutcome::Escalated(reason)
    }
}

fn failure_report(record: &VerificationRecord, remote: Option<&Task>, reason: &str) -> String {
    let remote_title = remote.map(|t| t.title.as_str()).unwrap_or("(not found)");
    format!(
        "❌ Task creation failed\nReason: {}\n\n📤 Sender: {}\n📝 Submitted text: {}\n📋 Expected title: {}\n📋 Title on board: {}\n\n🔄 Attempts: {}\n⏰ Created at: {}",
        reason,
        record.sender.display_name(),
        record.content,
        record.task.title,
        remote_title,
        record.retry_count + 1,
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
    )
}
