use crate::domain::{ChatId, Task, TaskId, User, UserId};
use crate::ports::{TaskStore, UserDirectory};
use dashmap::{DashMap, DashSet};
use std::collections::HashMap;
use std::sync::RwLock;

/// Process-local stand-in for the relay's persistent store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    known_tasks: DashSet<TaskId>,
    tasks: RwLock<Vec<Task>>,
    users: DashMap<UserId, User>,
    chats: DashSet<ChatId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn subscribe(&self, chat: ChatId) {
        self.chats.insert(chat);
    }

    /// Tasks submitted through the relay, oldest first.
    #[cfg(test)]
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks
            .read()
            .map(|tasks| tasks.clone())
            .unwrap_or_default()
    }
}

impl TaskStore for MemoryStore {
    fn is_known_task(&self, id: TaskId) -> bool {
        self.known_tasks.contains(&id)
    }

    fn add_known_task(&self, id: TaskId) {
        self.known_tasks.insert(id);
    }

    fn add_task(&self, task: &Task) {
        match self.tasks.write() {
            Ok(mut tasks) => tasks.push(task.clone()),
            Err(e) => tracing::error!("Task store lock poisoned, task {} not recorded: {}", task.id, e),
        }
    }

    fn chat_ids(&self) -> Vec<ChatId> {
        let mut chats: Vec<ChatId> = self.chats.iter().map(|chat| *chat).collect();
        chats.sort_by_key(|chat| chat.0);
        chats
    }
}

impl UserDirectory for MemoryStore {
    fn get_user(&self, id: UserId) -> Option<User> {
        self.users.get(&id).map(|entry| entry.value().clone())
    }

    fn get_users(&self) -> HashMap<UserId, User> {
        self.users
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;

    #[test]
    fn test_known_tasks() {
        let store = MemoryStore::new();
        assert!(!store.is_known_task(TaskId(7)));
        store.add_known_task(TaskId(7));
        assert!(store.is_known_task(TaskId(7)));
    }

    #[test]
    fn test_tasks_keep_submission_order() {
        let store = MemoryStore::new();
        let first = Task {
            id: TaskId(9),
            title: "Door handle".to_string(),
            ..Default::default()
        };
        let second = Task {
            title: "Not created yet".to_string(),
            ..Default::default()
        };
        store.add_task(&first);
        store.add_task(&second);
        assert_eq!(store.tasks(), vec![first, second]);
        assert!(!store.is_known_task(TaskId(9)));
    }

    #[test]
    fn test_users_and_chats() {
        let store = MemoryStore::new();
        store.add_user(User {
            id: UserId(1),
            role: UserRole::Admin,
            ..Default::default()
        });
        store.add_user(User {
            id: UserId(2),
            ..Default::default()
        });
        store.subscribe(ChatId(20));
        store.subscribe(ChatId(10));

        assert!(store.get_user(UserId(1)).unwrap().is_admin());
        assert_eq!(store.get_users().len(), 2);
        assert_eq!(store.chat_ids(), vec![ChatId(10), ChatId(20)]);
    }
}
