//! Messages for the TEA (The Elm Architecture) pattern.
//!
//! Messages are inputs to the update function. They come from three places:
//! terminal events, user intents (sent by key handlers or directly by the
//! command-line front end), and request completions sent back by the driver.

use crossterm::event::KeyEvent;

use crate::api::TaskPatch;
use crate::core::{Column, DropTarget, Folder, Scope, Task, TaskId, User};

#[derive(Debug, Clone)]
pub enum Message {
    // Keyboard/terminal events
    Key(KeyEvent),
    Resize(u16, u16),

    // User intents
    /// Mount: load the board and the profile.
    Init,
    /// Re-fetch the current scope.
    Refresh,
    CreateTask {
        title: String,
    },
    DeleteTask {
        id: TaskId,
    },
    SaveEdit {
        id: TaskId,
        patch: TaskPatch,
    },
    /// A dragged task was released over `over`.
    Drop {
        active: TaskId,
        over: DropTarget,
    },
    /// Switch the board to another listing.
    OpenScope {
        scope: Scope,
        title: String,
    },
    CreateFolder {
        title: String,
    },

    // Command completion callbacks
    BoardLoaded {
        scope: Scope,
        tasks: Vec<Task>,
    },
    BoardLoadFailed {
        scope: Scope,
        error: String,
    },
    TaskCreated {
        scope: Scope,
        task: Task,
    },
    TaskCreateFailed(String),
    TaskDeleted(TaskId),
    TaskDeleteFailed(TaskId, String),
    TaskUpdated(TaskId),
    TaskUpdateFailed(TaskId, String),
    StatusPersisted(TaskId),
    StatusPersistFailed {
        id: TaskId,
        status: Column,
        error: String,
    },
    FoldersLoaded(Vec<Folder>),
    FoldersLoadFailed(String),
    FolderCreated(Folder),
    FolderCreateFailed(String),
    ProfileLoaded(User),
    ProfileLoadFailed(String),
}

impl Message {
    /// Description of a failed request, for completion messages that report
    /// one.
    pub fn failure(&self) -> Option<String> {
        match self {
            Message::BoardLoadFailed { error, .. } => Some(format!("Loading tasks failed: {}", error)),
            Message::TaskCreateFailed(error) => Some(format!("Creating task failed: {}", error)),
            Message::TaskDeleteFailed(id, error) => {
                Some(format!("Deleting task #{} failed: {}", id, error))
            }
            Message::TaskUpdateFailed(id, error) => {
                Some(format!("Saving task #{} failed: {}", id, error))
            }
            Message::StatusPersistFailed { id, status, error } => Some(format!(
                "Moving task #{} to '{}' failed: {}",
                id, status, error
            )),
            Message::FoldersLoadFailed(error) => Some(format!("Loading folders failed: {}", error)),
            Message::FolderCreateFailed(error) => {
                Some(format!("Creating folder failed: {}", error))
            }
            Message::ProfileLoadFailed(error) => Some(format!("Loading profile failed: {}", error)),
            _ => None,
        }
    }
}
