use crate::core::{Column, FolderId, TaskId};
use crate::tea::model::Cursor;
use crate::tea::{Mode, Notification};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
pub struct TaskView {
    pub id: TaskId,
    pub title: String,
    pub priority: i64,
    pub category: Option<String>,
    /// `YYYY-MM-DD`
    pub due: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ColumnView {
    pub column: Column,
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Clone)]
pub struct FolderView {
    pub id: FolderId,
    pub title: String,
}

static VERSION_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn next_version() -> u64 {
    VERSION_COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone)]
pub struct RenderState {
    pub version: u64,
    pub columns: Vec<ColumnView>,
    pub cursor: Cursor,
    pub mode: Mode,
    /// Task currently picked up, if any.
    pub dragging: Option<TaskId>,
    pub scope_title: String,
    /// Signed-in user's display name, once the profile has loaded.
    pub user: Option<String>,
    pub loading: bool,
    /// An edit was sent and its refetch has not landed yet.
    pub saving: bool,
    pub input_buffer: String,
    pub notification: Option<Notification>,
    /// Whether the keymap legend is expanded (toggled by '?')
    pub show_keymap: bool,
    pub folders: Vec<FolderView>,
    pub folder_selected: usize,
}

impl RenderState {
    pub fn column(&self, column: Column) -> &[TaskView] {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.tasks.as_slice())
            .unwrap_or(&[])
    }

    pub fn selected_task(&self) -> Option<&TaskView> {
        self.column(self.cursor.column).get(self.cursor.row)
    }
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            version: 0,
            columns: Column::ALL
                .iter()
                .map(|&column| ColumnView {
                    column,
                    tasks: Vec::new(),
                })
                .collect(),
            cursor: Cursor::default(),
            mode: Mode::Board,
            dragging: None,
            scope_title: String::new(),
            user: None,
            loading: true,
            saving: false,
            input_buffer: String::new(),
            notification: None,
            show_keymap: false,
            folders: Vec::new(),
            folder_selected: 0,
        }
    }
}
