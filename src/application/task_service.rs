use super::verification::TaskVerifier;
use super::{AppError, AppResult};
use crate::domain::*;
use crate::ports::{TaskRepository, TaskStore, UserDirectory};
use std::sync::Arc;

pub const MIN_TITLE_CHARS: usize = 3;
const PHOTO_PLACEHOLDER: &str = "[Photo attached]";

/// What a sender asked for. The image, if any, is uploaded after the task exists.
#[derive(Debug, Clone, Default)]
pub struct NewTaskRequest {
    pub title: String,
    pub description: String,
    pub image: Option<Vec<u8>>,
}

pub struct TaskService {
    repository: Arc<dyn TaskRepository>,
    store: Arc<dyn TaskStore>,
    users: Arc<dyn UserDirectory>,
    verifier: TaskVerifier,
    board_id: i64,
}

impl TaskService {
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        store: Arc<dyn TaskStore>,
        users: Arc<dyn UserDirectory>,
        verifier: TaskVerifier,
        board_id: i64,
    ) -> Self {
        Self {
            repository,
            store,
            users,
            verifier,
            board_id,
        }
    }

    pub async fn list_tasks(&self, limit: usize) -> AppResult<Vec<Task>> {
        Ok(self.repository.get_tasks(limit).await?)
    }

    /// Creates the task, attaches the image and hands it to verification.
    ///
    /// Only registered, approved senders may submit. Returns once the create
    /// call succeeds; the verification check runs later. A failed image upload
    /// is logged and left for verification to catch.
    pub async fn submit(&self, sender_id: UserId, request: NewTaskRequest) -> AppResult<Task> {
        let title = request.title.trim();
        if title.chars().count() < MIN_TITLE_CHARS {
            return Err(AppError::Validation(format!(
                "task title must be at least {MIN_TITLE_CHARS} characters"
            )));
        }

        let sender = match self.users.get_user(sender_id) {
            Some(user) if user.approved => user,
            Some(_) => {
                return Err(AppError::Validation(format!(
                    "user {sender_id} is not approved yet"
                )))
            }
            None => {
                return Err(AppError::Validation(format!(
                    "user {sender_id} is not registered"
                )))
            }
        };

        let has_image = request.image.is_some();
        let description = if has_image && request.description.is_empty() {
            PHOTO_PLACEHOLDER.to_string()
        } else {
            request.description
        };

        let mut task = Task::draft(self.board_id, title, description.clone());
        task.priority = 1;
        task.assignee = sender.id.to_string();

        self.repository.create_task(&mut task).await?;

        if let Some(image) = &request.image {
            let attachment = Attachment::image("img");
            if let Err(e) = self
                .repository
                .upload_attachment(task.id, &attachment, image)
                .await
            {
                tracing::error!("Failed to upload image for task {}: {}", task.id, e);
            }
        }

        self.store.add_task(&task);
        self.verifier.start_task_verification(
            task.clone(),
            sender,
            description,
            has_image,
            request.image,
        );

        Ok(task)
    }

    /// Marks a task done. The task must be among the latest `limit` on the board.
    pub async fn complete_task(&self, id: TaskId, limit: usize) -> AppResult<Task> {
        let mut task = self
            .repository
            .get_tasks(limit)
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| AppError::Application(format!("Task {id} not found on the board")))?;

        task.mark_done();
        self.repository.update_task(&task).await?;
        Ok(task)
    }

    pub async fn add_comment(&self, id: TaskId, author: &User, text: &str) -> AppResult<Comment> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("comment text is empty".to_string()));
        }
        let comment = Comment::new(id, author, text);
        self.repository.add_comment(id, &comment).await?;
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::*;
    use crate::application::verification::VERIFICATION_DELAY;
    use crate::ports::MockTaskStore;
    use mockall::predicate::function;

    struct Harness {
        board: Arc<FakeBoard>,
        scheduler: Arc<ManualScheduler>,
        service: TaskService,
    }

    fn harness(board: FakeBoard, store: MockTaskStore) -> Harness {
        let board = Arc::new(board);
        let scheduler = Arc::new(ManualScheduler::default());
        let verifier = TaskVerifier::new(
            board.clone(),
            Arc::new(directory()),
            Arc::new(RecordingNotifier::default()),
            scheduler.clone(),
        );
        let service = TaskService::new(
            board.clone(),
            Arc::new(store),
            Arc::new(directory()),
            verifier,
            7,
        );
        Harness {
            board,
            scheduler,
            service,
        }
    }

    fn sender() -> User {
        user(3, "Carol", UserRole::User)
    }

    #[tokio::test]
    async fn test_submit_creates_records_and_schedules_verification() {
        let mut store = MockTaskStore::new();
        store
            .expect_add_task()
            .with(function(|t: &Task| t.id == TaskId(500)))
            .times(1)
            .return_const(());
        let h = harness(FakeBoard::default(), store);

        let request = NewTaskRequest {
            title: "  Broken window ".to_string(),
            description: "Second floor, east side".to_string(),
            image: None,
        };
        let task = h.service.submit(UserId(3), request).await.unwrap();

        assert_eq!(task.id, TaskId(500));
        assert_eq!(task.title, "Broken window");
        assert_eq!(task.board_id, 7);
        assert_eq!(task.priority, 1);
        assert_eq!(task.assignee, "3");
        assert_eq!(task.status, TaskStatus::New);
        assert_eq!(h.scheduler.delays(), vec![VERIFICATION_DELAY]);
        assert!(h.board.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_short_title_rejected_before_any_call() {
        let h = harness(FakeBoard::default(), MockTaskStore::new());

        let request = NewTaskRequest {
            title: "ab".to_string(),
            ..Default::default()
        };
        let err = h.service.submit(UserId(3), request).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(h.board.created_titles().is_empty());
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_unregistered_sender_rejected() {
        let mut store = MockTaskStore::new();
        store.expect_add_task().never();
        let h = harness(FakeBoard::default(), store);

        let request = NewTaskRequest {
            title: "Broken window".to_string(),
            ..Default::default()
        };
        let err = h.service.submit(UserId(404), request).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(msg) if msg.contains("not registered")));
        assert!(h.board.created_titles().is_empty());
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_failed_upload_still_verifies() {
        let mut board = FakeBoard::default();
        board.fail_upload = true;
        let mut store = MockTaskStore::new();
        store.expect_add_task().times(1).return_const(());
        let h = harness(board, store);

        let request = NewTaskRequest {
            title: "Cracked tile".to_string(),
            description: String::new(),
            image: Some(vec![1, 2, 3]),
        };
        let task = h.service.submit(UserId(3), request).await.unwrap();

        assert_eq!(task.description, PHOTO_PLACEHOLDER);
        assert_eq!(h.scheduler.pending(), 1);
    }

    #[tokio::test]
    async fn test_create_failure_is_returned() {
        let mut board = FakeBoard::default();
        board.fail_create = true;
        let mut store = MockTaskStore::new();
        store.expect_add_task().never();
        let h = harness(board, store);

        let request = NewTaskRequest {
            title: "Door lock".to_string(),
            ..Default::default()
        };
        let err = h.service.submit(UserId(3), request).await.unwrap_err();

        assert!(matches!(err, AppError::Repository(_)));
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_complete_task_marks_done() {
        let mut existing = Task::draft(7, "Replace filter", "");
        existing.id = TaskId(12);
        let h = harness(FakeBoard::with_listing(vec![existing]), MockTaskStore::new());

        let task = h.service.complete_task(TaskId(12), 100).await.unwrap();

        assert!(task.done);
        let updated = h.board.updated.lock().unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_complete_unknown_task_fails() {
        let h = harness(FakeBoard::default(), MockTaskStore::new());
        let err = h.service.complete_task(TaskId(99), 100).await.unwrap_err();
        assert!(matches!(err, AppError::Application(_)));
    }

    #[tokio::test]
    async fn test_add_comment() {
        let h = harness(FakeBoard::default(), MockTaskStore::new());

        let comment = h
            .service
            .add_comment(TaskId(12), &sender(), "Parts ordered")
            .await
            .unwrap();

        assert_eq!(comment.author_id, "3");
        let comments = h.board.comments.lock().unwrap();
        assert_eq!(comments[0].0, TaskId(12));
        assert_eq!(comments[0].1.text, "Parts ordered");
    }
}
