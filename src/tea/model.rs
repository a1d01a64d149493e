//! Model for the TEA (The Elm Architecture) pattern.
//!
//! The Model is pure application state - no channels, no handles, no runtime infrastructure.

use crate::api::{due_date_from_day, TaskPatch};
use crate::config::Config;
use crate::core::{Board, Column, Folder, Scope, Task, TaskId, User};
use crate::render::{next_version, ColumnView, FolderView, RenderState, TaskView};
use crate::{Error, Result};

/// Title shown for the top-level listing.
pub const INBOX_TITLE: &str = "All tasks";

/// Level of a notification message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Error notification - displayed in red with "Error:" prefix
    Error,
    /// Informational notification - displayed in green
    Info,
}

/// A notification message to display to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Application UI mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Board,
    /// A task is picked up and follows the cursor until dropped.
    Dragging(TaskId),
    Input(InputKind),
    /// Folder picker overlay.
    Folders,
}

/// Types of input prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    NewTask,
    NewFolder,
    ConfirmDelete,
    EditTitle,
    EditCategory,
    EditPriority,
    EditDueDate,
}

impl InputKind {
    pub fn label(&self) -> &'static str {
        match self {
            InputKind::NewTask => "New task",
            InputKind::NewFolder => "New folder",
            InputKind::ConfirmDelete => "Delete?",
            InputKind::EditTitle => "Title",
            InputKind::EditCategory => "Category",
            InputKind::EditPriority => "Priority",
            InputKind::EditDueDate => "Due (YYYY-MM-DD)",
        }
    }

    /// Cycle to next editor field (Tab behavior).
    /// Returns None for prompts outside the task editor.
    pub fn next(&self) -> Option<InputKind> {
        match self {
            InputKind::EditTitle => Some(InputKind::EditCategory),
            InputKind::EditCategory => Some(InputKind::EditPriority),
            InputKind::EditPriority => Some(InputKind::EditDueDate),
            InputKind::EditDueDate => Some(InputKind::EditTitle),
            InputKind::NewTask | InputKind::NewFolder | InputKind::ConfirmDelete => None,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.next().is_some()
    }
}

/// Board cursor: a column and a row within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub column: Column,
    pub row: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            column: Column::Todo,
            row: 0,
        }
    }
}

/// Working copy of the task being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub task: TaskId,
    pub title: String,
    pub category: String,
    pub priority: String,
    /// Priority the task had when the editor opened.
    pub base_priority: i64,
    /// `YYYY-MM-DD`, or empty for no due date.
    pub due_date: String,
    /// Set once the save is sent; the editor closes when the refetch lands.
    pub saving: bool,
}

impl EditDraft {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task: task.id,
            title: task.title.clone(),
            category: task.category.clone().unwrap_or_default(),
            priority: task.priority.to_string(),
            base_priority: task.priority,
            due_date: task.due_day().unwrap_or_default().to_string(),
            saving: false,
        }
    }

    /// Build the update body.
    ///
    /// Title, category and due date are always sent; an empty due date
    /// clears it and an empty category falls back to `default_category`.
    /// Priority is sent only when changed, so a task whose stored priority
    /// is outside the editable range can still be renamed.
    pub fn to_patch(&self, default_category: &str) -> Result<TaskPatch> {
        let priority = match self.priority.trim() {
            p if p == self.base_priority.to_string() => None,
            p => Some(p.parse::<i64>().map_err(|_| {
                Error::Validation(format!("priority must be a number, got '{}'", p))
            })?),
        };
        let due_date = match self.due_date.trim() {
            "" => None,
            day => Some(due_date_from_day(day)?),
        };
        let category = match self.category.trim() {
            "" => default_category,
            c => c,
        };
        let patch = TaskPatch {
            title: Some(self.title.trim().to_string()),
            category: Some(category.to_string()),
            priority,
            due_date: Some(due_date),
        };
        patch.validate()?;
        Ok(patch)
    }
}

/// Pure application state - the single source of truth.
pub struct Model {
    // Core state
    pub board: Board,
    pub scope: Scope,
    pub scope_title: String,
    /// True until the first listing for the current scope arrives.
    pub loading: bool,
    pub cursor: Cursor,
    pub mode: Mode,

    // Folders and profile
    pub folders: Vec<Folder>,
    pub folder_selected: usize,
    pub user: Option<User>,

    // Input state
    pub input_buffer: String,
    pub notification: Option<Notification>,
    pub pending_delete: Option<TaskId>,
    pub editor: Option<EditDraft>,

    // UI toggle state
    /// Whether the keymap legend is expanded (toggled by '?')
    pub show_keymap: bool,

    // Dirty flag - set when state changes and render is needed
    pub dirty: bool,

    // Config (immutable after init)
    pub config: Config,
}

impl Model {
    pub fn new(config: Config, scope: Scope) -> Self {
        Self {
            board: Board::new(),
            scope,
            scope_title: default_scope_title(scope),
            loading: true,
            cursor: Cursor::default(),
            mode: Mode::default(),
            folders: Vec::new(),
            folder_selected: 0,
            user: None,
            input_buffer: String::new(),
            notification: None,
            pending_delete: None,
            editor: None,
            show_keymap: false,
            dirty: true,
            config,
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.board.column(self.cursor.column).get(self.cursor.row)
    }

    pub fn selected_folder(&self) -> Option<&Folder> {
        self.folders.get(self.folder_selected)
    }

    /// Keep the cursor row inside its column after the board changed.
    pub fn clamp_cursor(&mut self) {
        let len = self.board.column(self.cursor.column).len();
        self.cursor.row = self.cursor.row.min(len.saturating_sub(1));
    }

    /// Put the cursor on `id`, wherever it now lives.
    pub fn follow(&mut self, id: TaskId) {
        if let Some((column, row)) = self.board.find(id) {
            self.cursor = Cursor { column, row };
        } else {
            self.clamp_cursor();
        }
    }

    /// Create an immutable snapshot for the render thread.
    ///
    /// Each snapshot gets a monotonically increasing version number so the
    /// render thread can skip redundant draws.
    pub fn snapshot(&self) -> RenderState {
        let dragging = match self.mode {
            Mode::Dragging(id) => Some(id),
            _ => None,
        };

        let columns = Column::ALL
            .iter()
            .map(|&column| ColumnView {
                column,
                tasks: self
                    .board
                    .column(column)
                    .iter()
                    .map(|t| TaskView {
                        id: t.id,
                        title: t.title.clone(),
                        priority: t.priority,
                        category: t.category.clone(),
                        due: t.due_day().map(str::to_string),
                    })
                    .collect(),
            })
            .collect();

        RenderState {
            version: next_version(),
            columns,
            cursor: self.cursor,
            mode: self.mode,
            dragging,
            scope_title: self.scope_title.clone(),
            user: self.user.as_ref().map(|u| u.display_name().to_string()),
            loading: self.loading,
            saving: self.editor.as_ref().is_some_and(|e| e.saving),
            input_buffer: self.input_buffer.clone(),
            notification: self.notification.clone(),
            show_keymap: self.show_keymap,
            folders: self
                .folders
                .iter()
                .map(|f| FolderView {
                    id: f.id,
                    title: f.title.clone(),
                })
                .collect(),
            folder_selected: self.folder_selected,
        }
    }
}

pub fn default_scope_title(scope: Scope) -> String {
    match scope {
        Scope::Inbox => INBOX_TITLE.to_string(),
        Scope::Folder(id) => format!("Folder #{}", id),
    }
}
