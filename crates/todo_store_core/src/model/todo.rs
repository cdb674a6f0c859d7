//! To-do item record.

use super::EntityId;
use serde::{Deserialize, Serialize};

pub type TodoId = EntityId;

/// One to-do entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// `None` until the store assigns a key.
    #[serde(default)]
    pub id: Option<TodoId>,
    pub title: String,
    /// Free-form details; empty when the caller supplies none.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_completed: bool,
}

impl Todo {
    /// Creates an unsaved, open to-do item.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: String::new(),
            is_completed: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn complete(&mut self) {
        self.is_completed = true;
    }

    pub fn reopen(&mut self) {
        self.is_completed = false;
    }
}
