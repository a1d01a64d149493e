//! Folders ("notebooks") and the signed-in user.

use serde::{Deserialize, Serialize};

use super::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(pub i64);

impl std::fmt::Display for FolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub title: String,
}

/// A folder together with its tasks, as returned by the detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderDetail {
    pub id: FolderId,
    pub title: String,
    #[serde(default)]
    pub notes: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    /// Name shown in the board header: the username when set, else the email.
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Which listing a board is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Top-level tasks (`GET /notes/`).
    #[default]
    Inbox,
    /// Tasks inside one folder (`GET /notebooks/{id}/`).
    Folder(FolderId),
}

impl Scope {
    pub fn folder(&self) -> Option<FolderId> {
        match self {
            Scope::Inbox => None,
            Scope::Folder(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Inbox => write!(f, "inbox"),
            Scope::Folder(id) => write!(f, "folder:{}", id),
        }
    }
}
