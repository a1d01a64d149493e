//! Commands for the TEA (The Elm Architecture) pattern.
//!
//! Commands are outputs from the update function. Every command except
//! `Quit` is one request to the task service; the driver runs it and
//! answers with exactly one completion [`Message`](super::Message).

use crate::api::{NewTask, TaskPatch};
use crate::core::{Column, Scope, TaskId};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Board listing (initial load, post-edit refetch, move reconciliation)
    LoadBoard { scope: Scope },

    // Task writes
    CreateTask { scope: Scope, new_task: NewTask },
    DeleteTask { id: TaskId },
    UpdateTask { id: TaskId, patch: TaskPatch },
    PersistStatus { id: TaskId, status: Column },

    // Folders and profile
    LoadFolders,
    CreateFolder { title: String },
    LoadProfile,

    // App lifecycle
    Quit,
}
