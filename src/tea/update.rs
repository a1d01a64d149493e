//! Pure update function for the TEA (The Elm Architecture) pattern.
//!
//! The update function takes a model and a message, mutates the model,
//! and returns a list of commands to execute.
//!
//! Board writes follow one of three protocols:
//! - moves and deletes are applied locally first, then persisted; a failed
//!   move is reconciled by re-fetching the listing, a failed delete is only
//!   logged
//! - creates wait for the service and insert the returned task
//! - edits are sent, then the whole listing is re-fetched

use crossterm::event::{KeyCode, KeyEvent};

use crate::api::NewTask;
use crate::core::{DropTarget, Scope, TaskId};
use crate::{tdlog, tdlog_debug, tdlog_error, tdlog_warn};

use super::command::Command;
use super::message::Message;
use super::model::{
    default_scope_title, Cursor, EditDraft, InputKind, Mode, Model, Notification,
    NotificationLevel, INBOX_TITLE,
};

/// Helper to set an error notification and mark model as dirty.
fn set_error(model: &mut Model, message: String) {
    tdlog_warn!("UI Error: {}", message);
    model.notification = Some(Notification {
        level: NotificationLevel::Error,
        message,
    });
    model.dirty = true;
}

fn set_info(model: &mut Model, message: String) {
    model.notification = Some(Notification {
        level: NotificationLevel::Info,
        message,
    });
    model.dirty = true;
}

/// Pure update function: Model + Message → Commands
///
/// Mutates the model (setting the dirty flag) and returns the requests to
/// run. All I/O happens via the returned Commands.
pub fn update(model: &mut Model, msg: Message) -> Vec<Command> {
    let mut cmds = Vec::new();

    match msg {
        Message::Key(key) => {
            model.notification = None; // Clear notification on any key press
            model.dirty = true; // Keyboard input always triggers render
            match model.mode {
                Mode::Board => update_board_mode(model, key, &mut cmds),
                Mode::Dragging(active) => update_drag_mode(model, key, active, &mut cmds),
                Mode::Input(kind) => update_input_mode(model, key, kind, &mut cmds),
                Mode::Folders => update_folder_mode(model, key, &mut cmds),
            }
        }

        Message::Resize(_, _) => {
            model.dirty = true; // Resize triggers re-render
        }

        // User intents
        Message::Init => {
            model.loading = true;
            model.dirty = true;
            cmds.push(Command::LoadBoard { scope: model.scope });
            cmds.push(Command::LoadProfile);
        }

        Message::Refresh => {
            cmds.push(Command::LoadBoard { scope: model.scope });
        }

        Message::CreateTask { title } => handle_create(model, title, &mut cmds),

        Message::DeleteTask { id } => handle_delete(model, id, &mut cmds),

        Message::SaveEdit { id, patch } => match patch.validate() {
            Ok(()) => {
                tdlog_debug!("Message::SaveEdit id={}", id);
                cmds.push(Command::UpdateTask { id, patch });
            }
            Err(e) => set_error(model, e.to_string()),
        },

        Message::Drop { active, over } => handle_drop(model, active, &over, &mut cmds),

        Message::OpenScope { scope, title } => {
            tdlog!("Opening {} ({})", title, scope);
            model.scope = scope;
            model.scope_title = title;
            model.board = crate::core::Board::new();
            model.cursor = Cursor::default();
            model.mode = Mode::Board;
            model.editor = None;
            model.pending_delete = None;
            model.loading = true;
            model.dirty = true;
            cmds.push(Command::LoadBoard { scope });
        }

        Message::CreateFolder { title } => {
            let title = title.trim().to_string();
            if title.is_empty() {
                set_error(model, "Folder title cannot be empty".to_string());
            } else {
                cmds.push(Command::CreateFolder { title });
            }
        }

        // Command completion callbacks
        Message::BoardLoaded { scope, tasks } => {
            if scope != model.scope {
                tdlog_debug!(
                    "Message::BoardLoaded discarded: scope={} current={}",
                    scope,
                    model.scope
                );
                return cmds;
            }
            tdlog_debug!("Message::BoardLoaded scope={} count={}", scope, tasks.len());
            model.board = crate::core::Board::from_tasks(tasks);
            model.loading = false;
            model.clamp_cursor();
            if model.editor.as_ref().is_some_and(|e| e.saving) {
                // The edit is settled once its refetch is on screen.
                model.editor = None;
                if matches!(model.mode, Mode::Input(kind) if kind.is_edit()) {
                    model.mode = Mode::Board;
                    model.input_buffer.clear();
                }
            }
            model.dirty = true;
        }

        Message::BoardLoadFailed { scope, error } => {
            tdlog_error!("Message::BoardLoadFailed scope={} err={}", scope, error);
            if scope == model.scope {
                model.loading = false;
                if let Some(editor) = model.editor.as_mut() {
                    editor.saving = false;
                }
                model.dirty = true;
            }
        }

        Message::TaskCreated { scope, task } => {
            tdlog!("Message::TaskCreated id={} title={}", task.id, task.title);
            if scope != model.scope {
                tdlog_debug!("Created task belongs to {}, not shown", scope);
                return cmds;
            }
            let id = task.id;
            if model.board.insert_created(task).is_none() {
                tdlog_warn!("Created task #{} has an unknown status, not shown", id);
            }
            model.clamp_cursor();
            model.dirty = true;
        }

        Message::TaskCreateFailed(err) => {
            tdlog_error!("Message::TaskCreateFailed err={}", err);
        }

        Message::TaskDeleted(id) => {
            tdlog_debug!("Message::TaskDeleted id={}", id);
        }

        Message::TaskDeleteFailed(id, err) => {
            // The task stays gone locally until the next refetch.
            tdlog_error!("Message::TaskDeleteFailed id={} err={}", id, err);
        }

        Message::TaskUpdated(id) => {
            tdlog_debug!("Message::TaskUpdated id={}", id);
            cmds.push(Command::LoadBoard { scope: model.scope });
        }

        Message::TaskUpdateFailed(id, err) => {
            tdlog_error!("Message::TaskUpdateFailed id={} err={}", id, err);
            if let Some(editor) = model.editor.as_mut().filter(|e| e.task == id) {
                editor.saving = false;
            }
            set_error(model, format!("Failed to save task: {}", err));
        }

        Message::StatusPersisted(id) => {
            tdlog_debug!("Message::StatusPersisted id={}", id);
        }

        Message::StatusPersistFailed { id, status, error } => {
            tdlog_error!(
                "Message::StatusPersistFailed id={} status={} err={}",
                id,
                status,
                error
            );
            cmds.push(Command::LoadBoard { scope: model.scope });
        }

        Message::FoldersLoaded(folders) => {
            tdlog_debug!("Message::FoldersLoaded count={}", folders.len());
            model.folders = folders;
            model.folder_selected = model
                .folder_selected
                .min(model.folders.len().saturating_sub(1));
            model.dirty = true;
        }

        Message::FoldersLoadFailed(err) => {
            tdlog_error!("Message::FoldersLoadFailed err={}", err);
            set_error(model, format!("Failed to load folders: {}", err));
        }

        Message::FolderCreated(folder) => {
            tdlog!("Message::FolderCreated id={} title={}", folder.id, folder.title);
            set_info(model, format!("Created folder '{}'", folder.title));
            model.folders.push(folder);
            model.folder_selected = model.folders.len() - 1;
        }

        Message::FolderCreateFailed(err) => {
            tdlog_error!("Message::FolderCreateFailed err={}", err);
            set_error(model, format!("Failed to create folder: {}", err));
        }

        Message::ProfileLoaded(user) => {
            tdlog_debug!("Message::ProfileLoaded email={}", user.email);
            model.user = Some(user);
            model.dirty = true;
        }

        Message::ProfileLoadFailed(err) => {
            tdlog_warn!("Message::ProfileLoadFailed err={}", err);
        }
    }

    cmds
}

/// Request a task in the current scope. The input is cleared whatever
/// happens next; blank titles never reach the service.
fn handle_create(model: &mut Model, title: String, cmds: &mut Vec<Command>) {
    model.input_buffer.clear();
    if title.trim().is_empty() {
        tdlog_debug!("Ignoring create with empty title");
        return;
    }
    let new_task = NewTask {
        title,
        notebook_id: model.scope.folder(),
        priority: Some(model.config.effective_priority()),
        category: Some(model.config.effective_category().to_string()),
    };
    cmds.push(Command::CreateTask {
        scope: model.scope,
        new_task,
    });
}

/// Remove locally, then ask the service to delete.
fn handle_delete(model: &mut Model, id: TaskId, cmds: &mut Vec<Command>) {
    match model.board.remove(id) {
        Some((column, task)) => {
            tdlog!("Deleting task #{} '{}' from {}", id, task.title, column);
            model.clamp_cursor();
            model.dirty = true;
            cmds.push(Command::DeleteTask { id });
        }
        None => tdlog_warn!("Delete ignored: task #{} is not on the board", id),
    }
}

/// Apply a drop locally, then persist the new status.
fn handle_drop(model: &mut Model, active: TaskId, over: &DropTarget, cmds: &mut Vec<Command>) {
    match model.board.drop_task(active, over) {
        Some(mv) => {
            tdlog_debug!("Moved task #{} {} -> {}", mv.task, mv.from, mv.to);
            model.dirty = true;
            cmds.push(Command::PersistStatus {
                id: mv.task,
                status: mv.to,
            });
        }
        None => tdlog_debug!("Drop of #{} over {} is a no-op", active, over),
    }
}

fn move_cursor(model: &mut Model, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            let len = model.board.column(model.cursor.column).len();
            if len > 0 {
                model.cursor.row = (model.cursor.row + 1) % len;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            let len = model.board.column(model.cursor.column).len();
            if len > 0 {
                model.cursor.row = model.cursor.row.checked_sub(1).unwrap_or(len - 1);
            }
        }
        KeyCode::Char('h') | KeyCode::Left => {
            if let Some(prev) = model.cursor.column.prev() {
                model.cursor.column = prev;
                model.clamp_cursor();
            }
        }
        KeyCode::Char('l') | KeyCode::Right => {
            if let Some(next) = model.cursor.column.next() {
                model.cursor.column = next;
                model.clamp_cursor();
            }
        }
        _ => return false,
    }
    true
}

fn update_board_mode(model: &mut Model, key: KeyEvent, cmds: &mut Vec<Command>) {
    if move_cursor(model, key) {
        return;
    }

    match key.code {
        KeyCode::Char('n') => {
            model.mode = Mode::Input(InputKind::NewTask);
            model.input_buffer.clear();
        }

        KeyCode::Char('d') => {
            if let Some(task) = model.selected_task() {
                model.pending_delete = Some(task.id);
                model.mode = Mode::Input(InputKind::ConfirmDelete);
                model.input_buffer.clear();
            }
        }

        KeyCode::Char('e') => {
            if let Some(task) = model.selected_task() {
                let draft = EditDraft::from_task(task);
                model.input_buffer = draft.title.clone();
                model.editor = Some(draft);
                model.mode = Mode::Input(InputKind::EditTitle);
            }
        }

        KeyCode::Char(' ') => {
            if let Some(task) = model.selected_task() {
                model.mode = Mode::Dragging(task.id);
            }
        }

        KeyCode::Char('H') | KeyCode::Char('L') => {
            let Some(task) = model.selected_task() else {
                return;
            };
            let id = task.id;
            let target = if key.code == KeyCode::Char('H') {
                model.cursor.column.prev()
            } else {
                model.cursor.column.next()
            };
            if let Some(column) = target {
                handle_drop(model, id, &DropTarget::Column(column), cmds);
                model.follow(id);
            }
        }

        KeyCode::Char('r') => {
            cmds.push(Command::LoadBoard { scope: model.scope });
        }

        KeyCode::Char('f') => {
            model.mode = Mode::Folders;
            cmds.push(Command::LoadFolders);
        }

        KeyCode::Char('b') => {
            if model.scope != Scope::Inbox {
                cmds.extend(update(
                    model,
                    Message::OpenScope {
                        scope: Scope::Inbox,
                        title: INBOX_TITLE.to_string(),
                    },
                ));
            }
        }

        KeyCode::Char('q') | KeyCode::Esc => {
            cmds.push(Command::Quit);
        }

        KeyCode::Char('?') => {
            model.show_keymap = !model.show_keymap;
        }

        _ => {}
    }
}

fn update_drag_mode(model: &mut Model, key: KeyEvent, active: TaskId, cmds: &mut Vec<Command>) {
    if move_cursor(model, key) {
        return;
    }

    match key.code {
        KeyCode::Enter | KeyCode::Char(' ') => {
            model.mode = Mode::Board;
            // Released over a task: that task's column. Over empty space:
            // the column under the cursor.
            let over = match model.selected_task() {
                Some(task) => DropTarget::Task(task.id),
                None => DropTarget::Column(model.cursor.column),
            };
            handle_drop(model, active, &over, cmds);
            model.follow(active);
        }

        KeyCode::Esc => {
            model.mode = Mode::Board;
            model.follow(active);
        }

        _ => {}
    }
}

fn update_input_mode(model: &mut Model, key: KeyEvent, kind: InputKind, cmds: &mut Vec<Command>) {
    match key.code {
        KeyCode::Enter => {
            if kind.is_edit() {
                submit_edit(model, kind, cmds);
                return;
            }

            let value = std::mem::take(&mut model.input_buffer);
            match kind {
                InputKind::NewTask => {
                    model.mode = Mode::Board;
                    handle_create(model, value, cmds);
                }
                InputKind::NewFolder => {
                    model.mode = Mode::Folders;
                    cmds.extend(update(model, Message::CreateFolder { title: value }));
                }
                InputKind::ConfirmDelete => {
                    model.mode = Mode::Board;
                    if let Some(id) = model.pending_delete.take() {
                        handle_delete(model, id, cmds);
                    }
                }
                _ => {}
            }
        }

        KeyCode::Tab => {
            // Cycle to next input field (store current, load next)
            if let Some(next_kind) = kind.next() {
                if model.editor.as_ref().is_some_and(|e| e.saving) {
                    return;
                }
                store_current_field(model, kind);
                model.mode = Mode::Input(next_kind);
                load_field_buffer(model, next_kind);
            }
        }

        KeyCode::Esc => {
            model.input_buffer.clear();
            model.pending_delete = None;
            model.editor = None;
            model.mode = if kind == InputKind::NewFolder {
                Mode::Folders
            } else {
                Mode::Board
            };
        }

        KeyCode::Backspace => {
            model.input_buffer.pop();
        }

        KeyCode::Char(c) => {
            if kind != InputKind::ConfirmDelete {
                model.input_buffer.push(c);
            }
        }

        _ => {}
    }
}

/// Send the editor's draft. The editor stays open, marked as saving, until
/// the refetch that follows the update arrives.
fn submit_edit(model: &mut Model, kind: InputKind, cmds: &mut Vec<Command>) {
    if model.editor.as_ref().is_none_or(|e| e.saving) {
        return;
    }
    store_current_field(model, kind);
    load_field_buffer(model, kind);

    let default_category = model.config.effective_category().to_string();
    let Some(editor) = model.editor.as_mut() else {
        return;
    };
    match editor.to_patch(&default_category) {
        Ok(patch) => {
            editor.saving = true;
            let id = editor.task;
            cmds.extend(update(model, Message::SaveEdit { id, patch }));
        }
        Err(e) => set_error(model, e.to_string()),
    }
}

/// Store current input buffer into the matching editor field.
fn store_current_field(model: &mut Model, kind: InputKind) {
    let value = std::mem::take(&mut model.input_buffer);
    let Some(editor) = model.editor.as_mut() else {
        return;
    };
    match kind {
        InputKind::EditTitle => editor.title = value,
        InputKind::EditCategory => editor.category = value,
        InputKind::EditPriority => editor.priority = value,
        InputKind::EditDueDate => editor.due_date = value,
        InputKind::NewTask | InputKind::NewFolder | InputKind::ConfirmDelete => {}
    }
}

/// Load the matching editor field into the input buffer.
fn load_field_buffer(model: &mut Model, kind: InputKind) {
    model.input_buffer = match (&model.editor, kind) {
        (Some(e), InputKind::EditTitle) => e.title.clone(),
        (Some(e), InputKind::EditCategory) => e.category.clone(),
        (Some(e), InputKind::EditPriority) => e.priority.clone(),
        (Some(e), InputKind::EditDueDate) => e.due_date.clone(),
        _ => String::new(),
    };
}

fn update_folder_mode(model: &mut Model, key: KeyEvent, cmds: &mut Vec<Command>) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if !model.folders.is_empty() {
                model.folder_selected = (model.folder_selected + 1) % model.folders.len();
            }
        }

        KeyCode::Char('k') | KeyCode::Up => {
            if !model.folders.is_empty() {
                model.folder_selected = model
                    .folder_selected
                    .checked_sub(1)
                    .unwrap_or(model.folders.len() - 1);
            }
        }

        KeyCode::Enter => {
            if let Some(folder) = model.selected_folder() {
                let scope = Scope::Folder(folder.id);
                let title = if folder.title.trim().is_empty() {
                    default_scope_title(scope)
                } else {
                    folder.title.clone()
                };
                cmds.extend(update(model, Message::OpenScope { scope, title }));
            }
        }

        KeyCode::Char('i') => {
            cmds.extend(update(
                model,
                Message::OpenScope {
                    scope: Scope::Inbox,
                    title: INBOX_TITLE.to_string(),
                },
            ));
        }

        KeyCode::Char('n') => {
            model.mode = Mode::Input(InputKind::NewFolder);
            model.input_buffer.clear();
        }

        KeyCode::Char('r') => {
            cmds.push(Command::LoadFolders);
        }

        KeyCode::Esc | KeyCode::Char('q') => {
            model.mode = Mode::Board;
        }

        _ => {}
    }
}
