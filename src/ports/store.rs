use crate::domain::{ChatId, Task, TaskId, User, UserId};
use std::collections::HashMap;

/// Local bookkeeping of tasks the relay has already seen or created.
#[cfg_attr(test, mockall::automock)]
pub trait TaskStore: Send + Sync {
    fn is_known_task(&self, id: TaskId) -> bool;
    fn add_known_task(&self, id: TaskId);
    fn add_task(&self, task: &Task);
    /// Chats subscribed to new-task broadcasts.
    fn chat_ids(&self) -> Vec<ChatId>;
}

#[cfg_attr(test, mockall::automock)]
pub trait UserDirectory: Send + Sync {
    fn get_user(&self, id: UserId) -> Option<User>;
    fn get_users(&self) -> HashMap<UserId, User>;
}
