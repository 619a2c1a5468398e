//! In-memory doubles for the async ports.

use crate::domain::{Attachment, ChatId, Comment, Task, TaskId, User, UserId, UserRole};
use crate::ports::{
    Job, MockUserDirectory, Notifier, NotifyError, NotifyResult, RepositoryError,
    RepositoryResult, Scheduler, TaskRepository,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Board double. Created tasks get ids from 500 upwards.
#[derive(Default)]
pub struct FakeBoard {
    pub listing: Mutex<Vec<Task>>,
    pub created: Mutex<Vec<Task>>,
    pub uploads: Mutex<Vec<(TaskId, Attachment, Vec<u8>)>>,
    pub updated: Mutex<Vec<Task>>,
    pub comments: Mutex<Vec<(TaskId, Comment)>>,
    /// Created tasks show up in later listings, attachments included.
    pub publish_created: bool,
    pub fail_listing: bool,
    pub fail_create: bool,
    pub fail_upload: bool,
    next_id: AtomicI64,
}

impl FakeBoard {
    pub fn with_listing(tasks: Vec<Task>) -> Self {
        Self {
            listing: Mutex::new(tasks),
            ..Default::default()
        }
    }

    pub fn created_titles(&self) -> Vec<String> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.title.clone())
            .collect()
    }

    fn unavailable() -> RepositoryError {
        RepositoryError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }
    }
}

#[async_trait]
impl TaskRepository for FakeBoard {
    async fn get_tasks(&self, limit: usize) -> RepositoryResult<Vec<Task>> {
        if self.fail_listing {
            return Err(Self::unavailable());
        }
        let listing = self.listing.lock().unwrap();
        Ok(listing.iter().take(limit).cloned().collect())
    }

    async fn create_task(&self, task: &mut Task) -> RepositoryResult<()> {
        if self.fail_create {
            return Err(Self::unavailable());
        }
        task.id = TaskId(500 + self.next_id.fetch_add(1, Ordering::SeqCst));
        self.created.lock().unwrap().push(task.clone());
        if self.publish_created {
            self.listing.lock().unwrap().push(task.clone());
        }
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> RepositoryResult<()> {
        self.updated.lock().unwrap().push(task.clone());
        Ok(())
    }

    async fn upload_attachment(
        &self,
        task_id: TaskId,
        attachment: &Attachment,
        data: &[u8],
    ) -> RepositoryResult<()> {
        if self.fail_upload {
            return Err(Self::unavailable());
        }
        self.uploads
            .lock()
            .unwrap()
            .push((task_id, attachment.clone(), data.to_vec()));
        if self.publish_created {
            let mut listing = self.listing.lock().unwrap();
            if let Some(task) = listing.iter_mut().find(|t| t.id == task_id) {
                task.attachments.push(attachment.id.clone());
            }
        }
        Ok(())
    }

    async fn add_comment(&self, task_id: TaskId, comment: &Comment) -> RepositoryResult<()> {
        self.comments.lock().unwrap().push((task_id, comment.clone()));
        Ok(())
    }
}

/// Records every message; chats in `unreachable` fail delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(ChatId, String)>>,
    pub unreachable: HashSet<ChatId>,
}

impl RecordingNotifier {
    pub fn recipients(&self) -> Vec<ChatId> {
        self.sent.lock().unwrap().iter().map(|(chat, _)| *chat).collect()
    }

    pub fn messages_for(&self, chat: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == chat)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, chat: ChatId, text: &str) -> NotifyResult<()> {
        if self.unreachable.contains(&chat) {
            return Err(NotifyError::Delivery {
                chat,
                reason: "blocked by user".to_string(),
            });
        }
        self.sent.lock().unwrap().push((chat, text.to_string()));
        Ok(())
    }
}

/// Holds scheduled jobs until the test runs them; no real time passes.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<Vec<(Duration, Job)>>,
}

impl ManualScheduler {
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.queue.lock().unwrap().iter().map(|(d, _)| *d).collect()
    }

    /// Runs the oldest job. Returns false when nothing was queued.
    pub async fn run_next(&self) -> bool {
        let next = {
            let mut queue = self.queue.lock().unwrap();
            if queue.is_empty() {
                None
            } else {
                Some(queue.remove(0))
            }
        };
        match next {
            Some((_, job)) => {
                job.await;
                true
            }
            None => false,
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, job: Job) {
        self.queue.lock().unwrap().push((delay, job));
    }
}

pub fn user(id: i64, first_name: &str, role: UserRole) -> User {
    User {
        id: UserId(id),
        username: first_name.to_lowercase(),
        first_name: first_name.to_string(),
        last_name: "Tester".to_string(),
        role,
        approved: true,
    }
}

/// Directory with two admins (ids 1 and 2) and one regular user (id 3).
pub fn directory() -> MockUserDirectory {
    let users: HashMap<UserId, User> = [
        user(1, "Alice", UserRole::Admin),
        user(2, "Bob", UserRole::Admin),
        user(3, "Carol", UserRole::User),
    ]
    .into_iter()
    .map(|u| (u.id, u))
    .collect();

    let mut directory = MockUserDirectory::new();
    let lookup = users.clone();
    directory
        .expect_get_user()
        .returning(move |id| lookup.get(&id).cloned());
    directory
        .expect_get_users()
        .returning(move || users.clone());
    directory
}
