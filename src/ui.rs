//! Terminal UI rendering for the task board.
//!
//! Layout, top to bottom: a one-line header (scope and user), a separator,
//! three status columns side by side, and the bottom status bar.
//! - Minimal chrome: columns are separated by whitespace, not borders
//! - Selection uses the REVERSED modifier to adapt to the terminal theme
//! - A picked-up task and its prospective column are drawn in the accent
//!
//! This module renders from RenderState (immutable snapshot) - it never
//! mutates application state.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::core::task::priority_label;
use crate::core::Column;
use crate::render::{RenderState, TaskView};
use crate::tea::{InputKind, Mode, Notification, NotificationLevel};

// Color tokens
const COLOR_TEXT_DIMMED: Color = Color::Gray;
const COLOR_TEXT_MUTED: Color = Color::DarkGray;
const COLOR_SEPARATOR: Color = Color::White;
const COLOR_ACCENT: Color = Color::Magenta;

// Priority color coding (uses terminal palette)
const COLOR_PRIORITY_URGENT: Color = Color::Red;
const COLOR_PRIORITY_HIGH: Color = Color::Yellow;
const COLOR_PRIORITY_MEDIUM: Color = Color::Cyan;
const COLOR_PRIORITY_LOW: Color = Color::Gray;

// Layout constants
const PRIORITY_WIDTH: usize = 7;
const COLUMN_GAP: u16 = 2;
const FOLDER_PANEL_WIDTH: u16 = 40;

// -----------------------------------------------------------------------------
// Context-sensitive keymap system
// -----------------------------------------------------------------------------

/// Context for determining which keybindings to display.
/// Derived from RenderState - this is the "view model" for the statusbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeymapContext {
    /// Browsing the board
    Board { has_selection: bool },
    /// Carrying a task
    Dragging,
    /// Folder picker
    Folders,
    /// Text input (new task, new folder, editor fields)
    TextInput,
    /// Delete confirmation mode
    DeleteConfirm,
}

impl KeymapContext {
    pub fn from_render_state(state: &RenderState) -> Self {
        match state.mode {
            Mode::Input(InputKind::ConfirmDelete) => KeymapContext::DeleteConfirm,
            Mode::Input(_) => KeymapContext::TextInput,
            Mode::Dragging(_) => KeymapContext::Dragging,
            Mode::Folders => KeymapContext::Folders,
            Mode::Board => KeymapContext::Board {
                has_selection: state.selected_task().is_some(),
            },
        }
    }
}

/// A single keybinding entry for display.
struct Keybinding(&'static str, &'static str);

/// A group of related keybindings (separated by │).
struct KeybindingGroup(Vec<Keybinding>);

fn keybindings_for_context(ctx: KeymapContext) -> Vec<KeybindingGroup> {
    match ctx {
        KeymapContext::Board { has_selection } => {
            let task_actions = if has_selection {
                vec![
                    Keybinding("space", "pick up"),
                    Keybinding("H/L", "move"),
                    Keybinding("e", "edit"),
                    Keybinding("d", "delete"),
                ]
            } else {
                vec![]
            };
            vec![
                KeybindingGroup(vec![Keybinding("n", "new")]),
                KeybindingGroup(task_actions),
                KeybindingGroup(vec![
                    Keybinding("f", "folders"),
                    Keybinding("b", "all tasks"),
                    Keybinding("r", "refresh"),
                ]),
                KeybindingGroup(vec![Keybinding("q", "quit")]),
            ]
        }
        KeymapContext::Dragging => vec![KeybindingGroup(vec![
            Keybinding("←→↑↓", "carry"),
            Keybinding("Enter", "drop"),
            Keybinding("Esc", "cancel"),
        ])],
        KeymapContext::Folders => vec![
            KeybindingGroup(vec![
                Keybinding("Enter", "open"),
                Keybinding("i", "all tasks"),
                Keybinding("n", "new folder"),
            ]),
            KeybindingGroup(vec![Keybinding("Esc", "back")]),
        ],
        KeymapContext::TextInput => vec![KeybindingGroup(vec![
            Keybinding("Enter", "submit"),
            Keybinding("Esc", "cancel"),
        ])],
        KeymapContext::DeleteConfirm => vec![KeybindingGroup(vec![
            Keybinding("Enter", "delete"),
            Keybinding("Esc", "cancel"),
        ])],
    }
}

/// Main render function - entry point for all UI drawing.
/// Takes an immutable RenderState snapshot.
pub fn draw(frame: &mut Frame, state: &RenderState) {
    render_main_layout(frame, state);

    if matches!(state.mode, Mode::Folders | Mode::Input(InputKind::NewFolder)) {
        render_folder_panel(frame, state, frame.area());
    }

    if let Some(ref notification) = state.notification {
        render_notification(frame, notification, frame.area());
    }
}

fn render_main_layout(frame: &mut Frame, state: &RenderState) {
    let area = frame.area();

    if area.height < 4 {
        render_statusbar(frame, state, area);
        return;
    }

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .split(area);

    render_header(frame, state, chunks[0]);
    render_separator(frame, chunks[1]);
    render_board(frame, state, chunks[2]);
    render_statusbar(frame, state, chunks[3]);
}

/// Scope title on the left, user on the right.
fn render_header(frame: &mut Frame, state: &RenderState, area: Rect) {
    let mut spans = vec![Span::styled(
        state.scope_title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if state.loading {
        spans.push(Span::styled(
            "  loading…",
            Style::default().fg(COLOR_TEXT_MUTED),
        ));
    } else if state.saving {
        spans.push(Span::styled(
            "  saving…",
            Style::default().fg(COLOR_TEXT_MUTED),
        ));
    }

    if let Some(user) = &state.user {
        let content_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let user = truncate(user, (area.width as usize) / 2);
        let spacer = (area.width as usize)
            .saturating_sub(content_width)
            .saturating_sub(user.chars().count());
        if spacer > 0 {
            spans.push(Span::raw(" ".repeat(spacer)));
        }
        spans.push(Span::styled(user, Style::default().fg(COLOR_TEXT_DIMMED)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_separator(frame: &mut Frame, area: Rect) {
    let solid = "─".repeat(area.width as usize);
    let line = Line::from(Span::styled(solid, Style::default().fg(COLOR_SEPARATOR)));
    frame.render_widget(Paragraph::new(line), area);
}

fn render_board(frame: &mut Frame, state: &RenderState, area: Rect) {
    let areas = Layout::horizontal([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ])
    .spacing(COLUMN_GAP)
    .split(area);

    for (column, column_area) in Column::ALL.into_iter().zip(areas.iter()) {
        render_column(frame, state, column, *column_area);
    }
}

/// Render one status column: header with count, then its tasks with the
/// selection kept in view.
fn render_column(frame: &mut Frame, state: &RenderState, column: Column, area: Rect) {
    let tasks = state.column(column);
    let has_cursor = state.cursor.column == column;
    let is_drop_target = state.dragging.is_some() && has_cursor;

    let header_style = if is_drop_target {
        Style::default()
            .fg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(COLOR_TEXT_DIMMED)
            .add_modifier(Modifier::BOLD)
    };
    let mut lines = vec![Line::from(Span::styled(
        format!("{} ({})", column, tasks.len()),
        header_style,
    ))];

    let content_height = area.height.saturating_sub(1) as usize;
    if tasks.is_empty() {
        if !state.loading && content_height > 0 {
            lines.push(Line::from(Span::styled(
                "(empty)",
                Style::default().fg(COLOR_TEXT_MUTED),
            )));
        }
    } else {
        // Scrolloff: keep the selected row centered once the column overflows.
        let selected = if has_cursor { state.cursor.row } else { 0 };
        let start = selected.saturating_sub(content_height / 2);
        let end = (start + content_height).min(tasks.len());
        let start = end.saturating_sub(content_height);

        lines.extend(
            tasks
                .iter()
                .enumerate()
                .skip(start)
                .take(content_height)
                .map(|(row, task)| {
                    let is_selected = has_cursor && row == state.cursor.row;
                    let is_dragged = state.dragging == Some(task.id);
                    render_task_row(task, is_selected, is_dragged, area.width)
                }),
        );
    }

    frame.render_widget(Paragraph::new(lines), area);
}

/// A task row: priority badge, title, then category and due date dimmed.
fn render_task_row(
    task: &TaskView,
    is_selected: bool,
    is_dragged: bool,
    width: u16,
) -> Line<'static> {
    let width = width as usize;
    let badge = format!(
        "{:<w$}",
        truncate(&priority_label(task.priority), PRIORITY_WIDTH - 1),
        w = PRIORITY_WIDTH
    );

    let mut detail = String::new();
    if let Some(category) = &task.category {
        detail.push_str("  ");
        detail.push_str(category);
    }
    if let Some(due) = &task.due {
        detail.push_str("  due ");
        detail.push_str(due);
    }

    let title_width = width.saturating_sub(PRIORITY_WIDTH);
    let title = truncate(&task.title, title_width);
    let detail = truncate(&detail, title_width.saturating_sub(title.chars().count()));

    let (badge_style, title_style, detail_style) = if is_dragged {
        let carried = Style::default()
            .fg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED);
        (carried, carried, carried)
    } else if is_selected {
        let selected = Style::default().add_modifier(Modifier::REVERSED);
        (selected, selected, selected)
    } else {
        (
            Style::default().fg(priority_color(task.priority)),
            Style::default(),
            Style::default().fg(COLOR_TEXT_MUTED),
        )
    };

    Line::from(vec![
        Span::styled(badge, badge_style),
        Span::styled(title, title_style),
        Span::styled(detail, detail_style),
    ])
}

fn priority_color(priority: i64) -> Color {
    match priority {
        p if p >= 4 => COLOR_PRIORITY_URGENT,
        3 => COLOR_PRIORITY_HIGH,
        2 => COLOR_PRIORITY_MEDIUM,
        _ => COLOR_PRIORITY_LOW,
    }
}

/// Bottom line: the input prompt in Input mode, otherwise the keymap.
fn render_statusbar(frame: &mut Frame, state: &RenderState, area: Rect) {
    let line = match state.mode {
        Mode::Input(kind) => render_input_line(state, kind),
        _ => render_keymap_line(state),
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// When show_keymap is false: just a dimmed "?".
/// When show_keymap is true: "? │ <full keymap legend>".
fn render_keymap_line(state: &RenderState) -> Line<'static> {
    let ctx = KeymapContext::from_render_state(state);
    let groups = keybindings_for_context(ctx);

    let key_style = Style::default().fg(COLOR_TEXT_DIMMED);
    let desc_style = Style::default().fg(COLOR_TEXT_MUTED);
    let sep_style = Style::default().fg(COLOR_TEXT_MUTED);

    let mut spans: Vec<Span> = Vec::new();

    // Dragging always shows its keys; the mode is easy to get stuck in otherwise.
    let expanded = state.show_keymap || ctx == KeymapContext::Dragging;
    let help_style = if expanded {
        Style::default()
    } else {
        Style::default().fg(COLOR_TEXT_MUTED)
    };
    spans.push(Span::styled("?", help_style));

    if expanded {
        for group in groups.iter() {
            if group.0.is_empty() {
                continue;
            }
            spans.push(Span::styled(" │ ", sep_style));
            for (key_idx, keybinding) in group.0.iter().enumerate() {
                if key_idx > 0 {
                    spans.push(Span::styled(" • ", sep_style));
                }
                spans.push(Span::styled(keybinding.0, key_style));
                spans.push(Span::styled(format!(" {}", keybinding.1), desc_style));
            }
        }
    }

    Line::from(spans)
}

/// Input prompt for the bottom line (replaces keymap when in input mode).
fn render_input_line(state: &RenderState, kind: InputKind) -> Line<'static> {
    let hint_key_style = Style::default().fg(COLOR_TEXT_MUTED);
    let label_style = Style::default().fg(Color::Reset);
    let input_style = Style::default().fg(Color::White);
    let cursor_style = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::SLOW_BLINK);

    let mut spans: Vec<Span> = vec![
        Span::styled("Enter ", hint_key_style),
        Span::styled("• ", hint_key_style),
    ];
    if kind.is_edit() {
        spans.push(Span::styled("Tab ", hint_key_style));
        spans.push(Span::styled("• ", hint_key_style));
    }
    spans.push(Span::styled("Esc  ", hint_key_style));

    if kind == InputKind::ConfirmDelete {
        let title = state
            .selected_task()
            .map(|t| format!(" '{}'", truncate(&t.title, 40)))
            .unwrap_or_default();
        spans.push(Span::styled(
            format!("{}{}", kind.label(), title),
            label_style,
        ));
    } else if state.saving {
        spans.push(Span::styled(
            format!("{}: {}  saving…", kind.label(), state.input_buffer),
            Style::default().fg(COLOR_TEXT_MUTED),
        ));
    } else {
        spans.push(Span::styled(format!("{}: ", kind.label()), label_style));
        spans.push(Span::styled(state.input_buffer.clone(), input_style));
        spans.push(Span::styled("_", cursor_style));
    }

    Line::from(spans)
}

/// Folder picker: a panel on the right edge, one folder per line.
fn render_folder_panel(frame: &mut Frame, state: &RenderState, area: Rect) {
    if area.height < 4 {
        return;
    }
    let width = FOLDER_PANEL_WIDTH.min(area.width);
    let panel = Rect {
        x: area.x + area.width - width,
        y: area.y + 2,
        width,
        height: area.height.saturating_sub(3),
    };
    frame.render_widget(Clear, panel);

    let mut lines = vec![Line::from(Span::styled(
        "FOLDERS",
        Style::default()
            .fg(COLOR_TEXT_DIMMED)
            .add_modifier(Modifier::BOLD),
    ))];
    if state.folders.is_empty() {
        lines.push(Line::from(Span::styled(
            "No folders. Press 'n' to create one.",
            Style::default().fg(COLOR_TEXT_DIMMED),
        )));
    } else {
        let content_height = panel.height.saturating_sub(1) as usize;
        let start = state
            .folder_selected
            .saturating_sub(content_height / 2)
            .min(state.folders.len().saturating_sub(content_height));
        lines.extend(
            state
                .folders
                .iter()
                .enumerate()
                .skip(start)
                .take(content_height)
                .map(|(idx, folder)| {
                    let style = if idx == state.folder_selected {
                        Style::default().add_modifier(Modifier::REVERSED)
                    } else {
                        Style::default()
                    };
                    Line::from(Span::styled(
                        truncate(&folder.title, width as usize),
                        style,
                    ))
                }),
        );
    }

    frame.render_widget(Paragraph::new(lines), panel);
}

/// Render notification message on the bottom line of the screen.
///
/// - Error: Red text with "Error:" prefix and bold styling
/// - Info: Green text without prefix
fn render_notification(frame: &mut Frame, notification: &Notification, area: Rect) {
    let notification_area = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };

    frame.render_widget(Clear, notification_area);

    let line = match notification.level {
        NotificationLevel::Error => Line::from(vec![
            Span::styled(
                "Error: ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                notification.message.clone(),
                Style::default().fg(Color::Red),
            ),
        ]),
        NotificationLevel::Info => Line::from(Span::styled(
            notification.message.clone(),
            Style::default().fg(Color::Green),
        )),
    };

    frame.render_widget(Paragraph::new(line), notification_area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 1).collect();
        format!("{}~", truncated)
    }
}
