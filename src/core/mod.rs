//! Core domain models: tasks, folders, and the column board built from them.

pub mod board;
pub mod folder;
pub mod task;

pub use board::{Board, DropTarget, Move};
pub use folder::{Folder, FolderDetail, FolderId, Scope, User};
pub use task::{Column, Task, TaskId};
