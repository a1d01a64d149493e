//! Task data model as served by the task service.
//!
//! The service owns tasks; the client only caches them. The `status` string
//! is kept verbatim so that tasks with a status the board does not know
//! survive a round trip, but only the three [`Column`]s are ever shown.

use serde::{Deserialize, Serialize};

/// Priority the service assigns when none is given.
pub const DEFAULT_PRIORITY: i64 = 1;

/// Category used for quick-created tasks.
pub const DEFAULT_CATEGORY: &str = "Miscellaneous";

/// Categories offered by the editor, in display order.
pub const CATEGORIES: [&str; 7] = [
    "Productivity",
    "Coding",
    "Study",
    "Personal",
    "Health & Habits",
    "Creative",
    "Miscellaneous",
];

/// Lowest and highest priority the editor accepts.
pub const PRIORITY_RANGE: std::ops::RangeInclusive<i64> = 1..=4;

/// Server-assigned task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().trim_start_matches('#').parse()?))
    }
}

/// A status column on the board.
///
/// The declaration order is the left-to-right display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Todo,
    Ongoing,
    Done,
}

impl Column {
    pub const ALL: [Column; 3] = [Column::Todo, Column::Ongoing, Column::Done];

    /// Wire name, as stored in `Task::status`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Todo => "TO DO",
            Column::Ongoing => "ONGOING",
            Column::Done => "DONE",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Column::Todo => 0,
            Column::Ongoing => 1,
            Column::Done => 2,
        }
    }

    /// Resolve a wire status. Unknown statuses have no column.
    pub fn from_status(status: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.as_str() == status)
    }

    /// Lenient parse for command-line input: accepts the wire name in any
    /// case plus `todo`/`to-do`/`doing` spellings.
    pub fn parse_lenient(input: &str) -> Option<Column> {
        let normalized: String = input
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "todo" => Some(Column::Todo),
            "ongoing" | "doing" => Some(Column::Ongoing),
            "done" => Some(Column::Done),
            _ => None,
        }
    }

    pub fn prev(&self) -> Option<Column> {
        self.index().checked_sub(1).map(|i| Column::ALL[i])
    }

    pub fn next(&self) -> Option<Column> {
        Column::ALL.get(self.index() + 1).copied()
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

/// A task ("note") as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    pub status: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

impl Task {
    /// The column this task belongs to, if its status is a known one.
    pub fn column(&self) -> Option<Column> {
        Column::from_status(&self.status)
    }

    /// Date part of the due date, for display.
    pub fn due_day(&self) -> Option<&str> {
        self.due_date.as_deref().map(|d| d.get(..10).unwrap_or(d))
    }
}

/// Human label for a priority value.
pub fn priority_label(priority: i64) -> String {
    match priority {
        4 => "Urgent".to_string(),
        3 => "High".to_string(),
        2 => "Medium".to_string(),
        1 => "Low".to_string(),
        other => format!("P{}", other),
    }
}
